//! Error types for the ledger layer.

use draftroom_protocol::{EntityId, RoomId};

/// The backing store could not serve a request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable. Picks fail closed while this lasts.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered, but with data the ledger cannot interpret.
    #[error("store data corrupt: {0}")]
    Corrupt(String),
}

/// Why a pick was not recorded.
#[derive(Debug, thiserror::Error)]
pub enum PickError {
    /// The entity is not in the master set. Callers asked for something
    /// that was never draftable.
    #[error("entity {0} is not in the master pool")]
    EntityUnknown(EntityId),

    /// Someone else got there first. The benign loser of a race.
    #[error("entity {0} was already picked")]
    AlreadyPicked(EntityId),

    /// Nothing was written; the store could not be reached.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

/// Errors from ledger operations other than picking.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The store already holds state for this room id.
    #[error("room {0} already exists in the ledger")]
    RoomExists(RoomId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
