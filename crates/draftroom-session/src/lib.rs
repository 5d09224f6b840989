//! Participant bookkeeping for Draftroom.
//!
//! This crate handles the lifecycle of the people in one room:
//!
//! 1. **Joining**: a stable key (username) gets a connection-bound
//!    [`ParticipantId`](draftroom_protocol::ParticipantId).
//! 2. **Disconnecting**: the live participant is frozen with its picks
//!    and preferences intact.
//! 3. **Reconnecting**: a later connection presenting the same key
//!    (case-insensitive) is re-attached to the frozen record under a
//!    fresh id.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← owns one SessionManager per room actor
//!     ↕
//! Session Layer (this crate)  ← who is in the room, connected or frozen
//!     ↕
//! Protocol Layer (below)  ← ParticipantId, ParticipantKey, PickRecord
//! ```
//!
//! Timers are not this crate's concern: the room decides what a
//! disconnect means for the current turn.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::{Reattached, SessionManager};
pub use session::{Participant, ParticipantState};
