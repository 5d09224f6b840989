//! The authoritative record of what has been picked.
//!
//! - [`AtomicStore`] is the persistent-store boundary. [`MemoryStore`]
//!   implements it in-process.
//! - [`EntityCatalog`] holds the seeded pool's metadata.
//! - [`PickLedger`] turns a pick request into one atomic check-and-insert
//!   and answers availability from the store, never from a cache.
//!
//! Two concurrent picks of the same entity in the same room can never
//! both succeed: the store decides, and the loser gets
//! [`PickError::AlreadyPicked`].

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod catalog;
mod error;
mod ledger;
mod store;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use catalog::EntityCatalog;
pub use error::{LedgerError, PickError, StoreError};
pub use ledger::{PickLedger, PickRequest, RoomStats};
pub use store::{AtomicStore, CheckAndInsert, CheckOutcome, MemoryStore};
