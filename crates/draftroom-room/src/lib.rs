//! Draft rooms for Draftroom.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! participants, its snake order, and its turn clock. Picks are
//! committed through the shared [`draftroom_ledger::PickLedger`], which
//! is the only place two rooms' tasks meet.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: seeds the pool, creates and destroys rooms
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`TurnSequencer`] / [`DraftPhase`]: snake order and draft phases
//! - [`place`]: where an entity would sit on a roster, if anywhere
//! - [`select_fallback`]: what auto-pick chooses
//! - [`RoomConfig`]: room settings (participant limits, timeouts, etc.)

mod config;
mod error;
mod governor;
mod manager;
mod room;
mod roster;
mod sequencer;

pub use config::RoomConfig;
pub use error::{ErrorKind, RoomError};
pub use governor::{Fallback, select_fallback};
pub use manager::{PendingRoom, RoomRegistry};
pub use room::{AutoPickOutcome, JoinOutcome, POOL_EVENT, ParticipantView, RoomHandle, RoomSnapshot};
pub use roster::{Placement, RosterEntry, SlotOpening, open_slots, place, slot_counts};
pub use sequencer::{Advance, DraftPhase, TurnSequencer};
