//! Error types for the session layer.

use draftroom_protocol::{ParticipantId, ParticipantKey};

/// Errors that can occur while tracking participants.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No participant, live or frozen, has this id.
    #[error("participant {0} not found")]
    NotFound(ParticipantId),

    /// Nobody with this key has ever joined the room.
    #[error("no participant known by key {0:?}")]
    UnknownKey(ParticipantKey),

    /// The key already has a live connection. One connection per key.
    #[error("participant {0:?} is already connected")]
    AlreadyConnected(ParticipantKey),

    /// The key belongs to a frozen participant; it must come back
    /// through reconnect, not join.
    #[error("participant {0:?} is disconnected and must reconnect")]
    MustReconnect(ParticipantKey),

    /// The connection id is already bound to someone in the room.
    #[error("participant id {0} is already in use")]
    IdInUse(ParticipantId),
}
