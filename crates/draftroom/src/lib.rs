//! # Draftroom
//!
//! Realtime coordination engine for snake drafts.
//!
//! Participants take turns claiming entities from a shared pool, one per
//! turn, in an order that reverses every round. Each room runs as its own
//! actor; every pick goes through an atomic check-and-insert in the
//! persistent store, so no entity is ever claimed twice in a room.
//! Timeouts and disconnects fall back to auto-pick, and every committed
//! change is broadcast in order through a rate-limited pipeline.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use draftroom::prelude::*;
//!
//! # async fn run() -> Result<(), DraftroomError> {
//! let engine = DraftEngine::builder().build(Arc::new(MemoryStore::new()), MemoryPublisher::new());
//! engine.seed_pool([Entity::new(1, "QB"), Entity::new(2, "RB")]).await?;
//! let room = engine
//!     .create_room(RoomProvision {
//!         room_id: RoomId(1),
//!         participants: Vec::new(),
//!         lineup: LineupConfig::standard(),
//!         max_rounds: 1,
//!     })
//!     .await?;
//! engine.join(room, ParticipantId(1), ParticipantKey::new("alice"), None).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{DraftEngine, DraftEngineBuilder};
pub use error::DraftroomError;

pub use draftroom_clock as clock;
pub use draftroom_ledger as ledger;
pub use draftroom_protocol as protocol;
pub use draftroom_room as room;
pub use draftroom_session as session;
pub use draftroom_transport as transport;

/// Everything needed to embed an engine.
pub mod prelude {
    pub use crate::{DraftEngine, DraftEngineBuilder, DraftroomError, EngineConfig};
    pub use draftroom_clock::{ClockConfig, TurnKey};
    pub use draftroom_ledger::{AtomicStore, MemoryStore, RoomStats};
    pub use draftroom_protocol::{
        Category, DeadlineKind, DraftEvent, Entity, EntityId, LineupConfig, ParticipantId,
        ParticipantKey, ParticipantSeed, PickRecord, PickSource, RawEntity, RoomId, RoomProvision,
        RosterSlot, SlotLimit,
    };
    pub use draftroom_room::{
        AutoPickOutcome, DraftPhase, ErrorKind, JoinOutcome, RoomConfig, RoomSnapshot,
    };
    pub use draftroom_transport::{MemoryPublisher, PipelineConfig, PipelineStats, WebSocketPublisher};
}
