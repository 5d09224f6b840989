//! Shared vocabulary for Draftroom.
//!
//! This crate defines the data every other crate speaks in:
//!
//! - **Types** ([`EntityId`], [`ParticipantId`], [`PickRecord`], ...):
//!   ids and records that cross crate boundaries.
//! - **Lineups** ([`LineupConfig`], [`RosterSlot`]): the roster shape a
//!   room enforces.
//! - **Events** ([`DraftEvent`]): what observers are told.
//! - **Chunks** ([`Chunk`], [`ChunkAssembler`]): how large payloads
//!   are split for the realtime channel and put back together.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how all of it becomes bytes.
//!
//! It knows nothing about rooms, timers, or stores.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod chunk;
mod codec;
mod error;
mod event;
mod lineup;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use chunk::{
    Chunk, ChunkAssembler, ChunkTrailer, DEFAULT_CHUNK_SIZE, chunk_event_name, split_into_chunks,
    trailer_event_name,
};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{DeadlineKind, DraftEvent};
pub use lineup::{LineupConfig, RosterSlot, SlotLimit};
pub use types::{
    Category, Entity, EntityId, ParticipantId, ParticipantKey, ParticipantSeed, PickRecord,
    PickSource, RawEntity, RoomId, RoomProvision, room_channel, unix_millis,
};
