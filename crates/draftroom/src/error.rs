//! Unified error type for Draftroom.

use draftroom_ledger::{LedgerError, StoreError};
use draftroom_protocol::ProtocolError;
use draftroom_room::{ErrorKind, RoomError};
use draftroom_session::SessionError;
use draftroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `draftroom` crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?`
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DraftroomError {
    /// A transport-level error (bind, publish, rate limit).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid entity or lineup).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The persistent store is unreachable or returned garbage.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A participant bookkeeping error (unknown key, already connected).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not your turn, no legal slot, already picked).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The engine configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl DraftroomError {
    /// Classifies the error the same way [`RoomError::kind`] does.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Room(e) => e.kind(),
            Self::Store(_) => ErrorKind::StoreUnavailable,
            Self::Ledger(LedgerError::Store(_)) => ErrorKind::StoreUnavailable,
            Self::Ledger(LedgerError::RoomExists(_)) => ErrorKind::Fatal,
            Self::Session(_) => ErrorKind::Validation,
            Self::Protocol(_) | Self::Config(_) => ErrorKind::Fatal,
            Self::Transport(_) => ErrorKind::Unavailable,
        }
    }
}
