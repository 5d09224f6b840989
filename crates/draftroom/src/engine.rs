//! `DraftEngine` builder and facade.
//!
//! This is the entry point for embedding Draftroom. It ties together all
//! the layers: store → ledger → rooms → broadcast pipeline.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use draftroom_clock::TurnKey;
use draftroom_ledger::{AtomicStore, EntityCatalog, MemoryStore, PickLedger, RoomStats};
use draftroom_protocol::{
    Category, Entity, EntityId, ParticipantId, ParticipantKey, PickRecord, RawEntity, RoomId,
    RoomProvision,
};
use draftroom_room::{
    AutoPickOutcome, JoinOutcome, RoomConfig, RoomError, RoomHandle, RoomRegistry, RoomSnapshot,
};
use draftroom_transport::{Broadcaster, PipelineConfig, PipelineStats, Publisher, WebSocketPublisher};
use tokio::sync::Mutex;

use crate::{DraftroomError, EngineConfig};

/// Builder for configuring and starting a [`DraftEngine`].
///
/// # Example
///
/// ```rust,ignore
/// use draftroom::prelude::*;
///
/// let engine = DraftEngine::builder()
///     .config(EngineConfig::from_json(&raw)?)
///     .build(Arc::new(MemoryStore::new()), MemoryPublisher::new());
/// engine.seed_pool(entities).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DraftEngineBuilder {
    config: EngineConfig,
}

impl DraftEngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the settings every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Sets the broadcast pipeline tuning.
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.config.pipeline = config;
        self
    }

    /// Builds the engine over `store`, publishing through `publisher`.
    ///
    /// Must be called from within a Tokio runtime: the broadcast
    /// pipeline's drain task is spawned here.
    pub fn build<S: AtomicStore, P: Publisher>(self, store: Arc<S>, publisher: P) -> DraftEngine<S> {
        let config = self.config.validated();
        let ledger = PickLedger::new(store);
        let broadcaster = Broadcaster::spawn(publisher, config.pipeline);
        let registry = RoomRegistry::new(ledger.clone(), broadcaster.clone(), config.room);
        tracing::info!("draft engine ready");
        DraftEngine {
            registry: Mutex::new(registry),
            ledger,
            broadcaster,
        }
    }

    /// Binds a [`WebSocketPublisher`] on `addr` and builds over it.
    /// Returns the engine and the bound address.
    pub async fn build_with_websocket<S: AtomicStore>(
        self,
        store: Arc<S>,
        addr: &str,
        max_per_second: u32,
    ) -> Result<(DraftEngine<S>, SocketAddr), DraftroomError> {
        let publisher = WebSocketPublisher::bind(addr, max_per_second).await?;
        let local_addr = publisher.local_addr();
        tracing::info!(%local_addr, max_per_second, "websocket publisher bound");
        Ok((self.build(store, publisher), local_addr))
    }
}

/// A running draft engine.
///
/// The registry lock only guards bookkeeping. Store round trips, actor
/// shutdown and room operations all run after it is released, on a
/// cloned handle, so one slow room or store call never blocks another.
pub struct DraftEngine<S> {
    registry: Mutex<RoomRegistry<S>>,
    ledger: PickLedger<S>,
    broadcaster: Broadcaster,
}

impl DraftEngine<MemoryStore> {
    /// Creates a new builder.
    pub fn builder() -> DraftEngineBuilder {
        DraftEngineBuilder::new()
    }
}

impl<S: AtomicStore> DraftEngine<S> {
    async fn room(&self, room_id: RoomId) -> Result<RoomHandle, DraftroomError> {
        Ok(self.registry.lock().await.room(room_id)?)
    }

    // -- pool and rooms -----------------------------------------------------

    /// Loads the master pool. Returns how many entities it holds.
    pub async fn seed_pool(&self, entities: impl IntoIterator<Item = Entity>) -> Result<usize, DraftroomError> {
        let catalog = EntityCatalog::from_entities(entities)?;
        self.ledger.seed_master(&catalog).await?;
        Ok(self.registry.lock().await.install_catalog(catalog))
    }

    /// Normalizes provisioning-shaped entities, then seeds them.
    pub async fn seed_raw_pool(&self, raw: impl IntoIterator<Item = RawEntity>) -> Result<usize, DraftroomError> {
        let entities = raw
            .into_iter()
            .map(Entity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.seed_pool(entities).await
    }

    pub async fn create_room(&self, provision: RoomProvision) -> Result<RoomId, DraftroomError> {
        let pending = self.registry.lock().await.reserve(provision)?;
        let room_id = pending.room_id();
        if let Err(e) = self.ledger.create_room(room_id).await {
            self.registry.lock().await.release(room_id);
            return Err(RoomError::from(e).into());
        }
        let handle = self.registry.lock().await.activate(pending);
        Ok(handle.room_id())
    }

    /// Stops the room and deletes its ledger state.
    pub async fn destroy_room(&self, room_id: RoomId) -> Result<(), DraftroomError> {
        let handle = self.registry.lock().await.detach(room_id)?;
        Ok(RoomRegistry::teardown(&self.ledger, handle).await?)
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.registry.lock().await.room_ids()
    }

    // -- participants -------------------------------------------------------

    pub async fn join(
        &self,
        room_id: RoomId,
        participant: ParticipantId,
        key: ParticipantKey,
        display_name: Option<String>,
    ) -> Result<JoinOutcome, DraftroomError> {
        let room = self.room(room_id).await?;
        Ok(room.join(participant, key, display_name).await?)
    }

    pub async fn leave(&self, room_id: RoomId, participant: ParticipantId) -> Result<(), DraftroomError> {
        Ok(self.room(room_id).await?.leave(participant).await?)
    }

    pub async fn set_preferences(
        &self,
        room_id: RoomId,
        participant: ParticipantId,
        preferences: Vec<EntityId>,
    ) -> Result<Vec<EntityId>, DraftroomError> {
        let room = self.room(room_id).await?;
        Ok(room.set_preferences(participant, preferences).await?)
    }

    pub async fn disconnect(&self, room_id: RoomId, participant: ParticipantId) -> Result<(), DraftroomError> {
        Ok(self.room(room_id).await?.disconnect(participant).await?)
    }

    /// Re-attaches `key` under a new connection id. Returns the old id.
    pub async fn reconnect(
        &self,
        room_id: RoomId,
        key: ParticipantKey,
        participant: ParticipantId,
    ) -> Result<ParticipantId, DraftroomError> {
        let room = self.room(room_id).await?;
        Ok(room.reconnect(key, participant).await?)
    }

    // -- drafting -----------------------------------------------------------

    /// Starts the draft. Returns the base turn order.
    pub async fn start_draft(&self, room_id: RoomId) -> Result<Vec<ParticipantId>, DraftroomError> {
        Ok(self.room(room_id).await?.start().await?)
    }

    pub async fn make_pick(
        &self,
        room_id: RoomId,
        participant: ParticipantId,
        entity: EntityId,
    ) -> Result<PickRecord, DraftroomError> {
        Ok(self.room(room_id).await?.pick(participant, entity).await?)
    }

    pub async fn request_auto_pick(
        &self,
        room_id: RoomId,
        participant: ParticipantId,
    ) -> Result<AutoPickOutcome, DraftroomError> {
        Ok(self.room(room_id).await?.auto_pick(participant).await?)
    }

    pub async fn next_turn(&self, room_id: RoomId) -> Result<Option<(TurnKey, ParticipantId)>, DraftroomError> {
        Ok(self.room(room_id).await?.next_turn().await?)
    }

    // -- observation --------------------------------------------------------

    pub async fn room_snapshot(&self, room_id: RoomId) -> Result<RoomSnapshot, DraftroomError> {
        Ok(self.room(room_id).await?.snapshot().await?)
    }

    /// Committed picks of a live room, in pick-number order.
    pub async fn pick_history(&self, room_id: RoomId) -> Result<Vec<PickRecord>, DraftroomError> {
        self.room(room_id).await?;
        Ok(self.ledger.pick_history(room_id).await?)
    }

    /// The room's available pool, optionally narrowed to one category.
    pub async fn available_entities(
        &self,
        room_id: RoomId,
        category: Option<&Category>,
    ) -> Result<BTreeSet<EntityId>, DraftroomError> {
        self.room(room_id).await?;
        Ok(self.ledger.available_entities(room_id, category).await?)
    }

    pub async fn room_stats(&self, room_id: RoomId) -> Result<RoomStats, DraftroomError> {
        self.room(room_id).await?;
        Ok(self.ledger.room_stats(room_id).await?)
    }

    /// Pings the store.
    pub async fn health_check(&self) -> Result<(), DraftroomError> {
        Ok(self.ledger.health_check().await?)
    }

    /// Broadcast pipeline counters; `degraded` is set after a publish
    /// failure until [`reset_transport`](Self::reset_transport).
    pub fn transport_status(&self) -> PipelineStats {
        self.broadcaster.stats()
    }

    pub fn reset_transport(&self) {
        self.broadcaster.reset();
    }

    /// Waits until every event queued so far has been published or dropped.
    pub async fn flush_broadcasts(&self) {
        self.broadcaster.flush().await;
    }
}
