//! Error types for the room layer.

use draftroom_ledger::{LedgerError, PickError, StoreError};
use draftroom_protocol::{EntityId, ParticipantId, ParticipantKey, ProtocolError, RoomId};
use draftroom_session::SessionError;

/// How a caller should treat a [`RoomError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request was rejected. Nothing changed; fix the request.
    Validation,
    /// Another pick took the entity first. Choose again or let
    /// auto-pick resolve it.
    RaceLoss,
    /// The atomic store is unreachable. Picks fail closed.
    StoreUnavailable,
    /// The room could not be created.
    Fatal,
    /// The room actor is gone or not answering.
    Unavailable,
}

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A room with this id already exists, in the registry or the store.
    #[error("room {0} already exists")]
    AlreadyExists(RoomId),

    /// The provisioning input cannot produce a working room.
    #[error("invalid room provision: {0}")]
    InvalidProvision(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room is full.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The room has a seed list and this key is not on it.
    #[error("participant {0:?} is not part of this room")]
    NotInvited(ParticipantKey),

    /// The draft is in a phase that doesn't allow this operation.
    #[error("invalid draft phase for this operation: {0}")]
    InvalidPhase(String),

    /// Too few connected participants to start.
    #[error("need at least {need} connected participants to start, have {have}")]
    NotEnoughParticipants { have: usize, need: usize },

    /// Someone else holds the turn.
    #[error("it is not {participant}'s turn")]
    NotYourTurn {
        participant: ParticipantId,
        current: Option<ParticipantId>,
    },

    /// The participant is disconnected; its turn belongs to the clock
    /// until it reconnects.
    #[error("participant {0} is disconnected")]
    Disconnected(ParticipantId),

    /// The entity is not part of the pool.
    #[error("entity {0} is not in the pool")]
    EntityUnknown(EntityId),

    /// The entity fits no open slot of the participant's roster.
    #[error("cannot place entity {entity}: {reason}")]
    NoLegalSlot { entity: EntityId, reason: String },

    /// Lost the race for the entity.
    #[error("entity {0} was already picked")]
    AlreadyPicked(EntityId),

    #[error("store unavailable: {0}")]
    StoreUnavailable(StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyPicked(_) => ErrorKind::RaceLoss,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::AlreadyExists(_) | Self::InvalidProvision(_) | Self::Protocol(_) => ErrorKind::Fatal,
            Self::NotFound(_) | Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::RoomFull(_)
            | Self::NotInvited(_)
            | Self::InvalidPhase(_)
            | Self::NotEnoughParticipants { .. }
            | Self::NotYourTurn { .. }
            | Self::Disconnected(_)
            | Self::EntityUnknown(_)
            | Self::NoLegalSlot { .. }
            | Self::Session(_) => ErrorKind::Validation,
        }
    }
}

impl From<StoreError> for RoomError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e)
    }
}

impl From<PickError> for RoomError {
    fn from(e: PickError) -> Self {
        match e {
            PickError::EntityUnknown(id) => Self::EntityUnknown(id),
            PickError::AlreadyPicked(id) => Self::AlreadyPicked(id),
            PickError::StoreUnavailable(e) => Self::StoreUnavailable(e),
        }
    }
}

impl From<LedgerError> for RoomError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::RoomExists(id) => Self::AlreadyExists(id),
            LedgerError::Store(e) => Self::StoreUnavailable(e),
        }
    }
}
