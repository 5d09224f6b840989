//! Room registry: seeds the entity pool, creates and tracks rooms.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use draftroom_ledger::{AtomicStore, EntityCatalog, PickLedger};
use draftroom_protocol::{Entity, RoomId, RoomProvision};
use draftroom_transport::Broadcaster;

use crate::room::{RoomSetup, spawn_room};
use crate::{RoomConfig, RoomError, RoomHandle};

/// Manages every active room of one process.
///
/// This is the entry point for room operations from the engine layer.
/// Rooms share the ledger, the catalog, and the broadcaster; everything
/// else is private to each room's actor.
pub struct RoomRegistry<S> {
    rooms: HashMap<RoomId, RoomHandle>,
    /// Ids between `reserve` and `activate`/`release`.
    reserved: HashSet<RoomId>,
    ledger: PickLedger<S>,
    catalog: Arc<EntityCatalog>,
    broadcaster: Broadcaster,
    config: RoomConfig,
}

/// A validated provision whose id is held by [`RoomRegistry::reserve`].
#[derive(Debug)]
pub struct PendingRoom {
    provision: RoomProvision,
    catalog: Arc<EntityCatalog>,
}

impl PendingRoom {
    pub fn room_id(&self) -> RoomId {
        self.provision.room_id
    }
}

impl<S: AtomicStore> RoomRegistry<S> {
    pub fn new(ledger: PickLedger<S>, broadcaster: Broadcaster, config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            reserved: HashSet::new(),
            ledger,
            catalog: Arc::new(EntityCatalog::default()),
            broadcaster,
            config: config.validated(),
        }
    }

    /// Loads the master pool. Rooms created afterwards draft from it;
    /// rooms already running keep the catalog they were created with.
    pub async fn seed_pool(&mut self, entities: impl IntoIterator<Item = Entity>) -> Result<usize, RoomError> {
        let catalog = EntityCatalog::from_entities(entities)?;
        self.ledger.seed_master(&catalog).await?;
        Ok(self.install_catalog(catalog))
    }

    /// Makes `catalog` the pool for rooms created from now on. The
    /// caller has already written it to the ledger's master set.
    pub fn install_catalog(&mut self, catalog: EntityCatalog) -> usize {
        tracing::info!(
            entities = catalog.len(),
            categories = catalog.categories().len(),
            "entity pool installed"
        );
        self.catalog = Arc::new(catalog);
        self.catalog.len()
    }

    /// Validates a provision and spawns its room.
    ///
    /// # Errors
    /// - [`RoomError::InvalidProvision`]: bad lineup, `max_rounds` outside
    ///   `1..=capacity`, too many or duplicate seeds, or no seeded pool.
    /// - [`RoomError::AlreadyExists`]: the id is live here or known to
    ///   the ledger.
    pub async fn create_room(&mut self, provision: RoomProvision) -> Result<RoomHandle, RoomError> {
        let pending = self.reserve(provision)?;
        let room_id = pending.room_id();
        if let Err(e) = self.ledger.create_room(room_id).await {
            self.release(room_id);
            return Err(e.into());
        }
        Ok(self.activate(pending))
    }

    /// First half of [`create_room`](Self::create_room): validates the
    /// provision and holds its id so no other creation can take it.
    /// Finish with [`activate`](Self::activate) once the ledger has the
    /// room, or [`release`](Self::release) if it refused.
    pub fn reserve(&mut self, provision: RoomProvision) -> Result<PendingRoom, RoomError> {
        let room_id = provision.room_id;
        self.validate(&provision)?;
        if self.rooms.contains_key(&room_id) || !self.reserved.insert(room_id) {
            return Err(RoomError::AlreadyExists(room_id));
        }
        Ok(PendingRoom {
            provision,
            catalog: Arc::clone(&self.catalog),
        })
    }

    /// Spawns a reserved room's actor.
    pub fn activate(&mut self, pending: PendingRoom) -> RoomHandle {
        let PendingRoom { provision, catalog } = pending;
        let room_id = provision.room_id;
        let max_rounds = provision.max_rounds;
        let seeds = provision.participants.len();
        self.reserved.remove(&room_id);

        let handle = spawn_room(RoomSetup {
            provision,
            config: self.config.clone(),
            ledger: self.ledger.clone(),
            catalog,
            broadcaster: self.broadcaster.clone(),
        });
        self.rooms.insert(room_id, handle.clone());
        tracing::info!(%room_id, max_rounds, seeds, "room created");
        handle
    }

    /// Drops a reservation that will not be activated.
    pub fn release(&mut self, room_id: RoomId) {
        self.reserved.remove(&room_id);
    }

    fn validate(&self, provision: &RoomProvision) -> Result<(), RoomError> {
        provision
            .lineup
            .validate()
            .map_err(|e| RoomError::InvalidProvision(e.to_string()))?;

        let capacity = provision.lineup.capacity();
        if provision.max_rounds == 0 || provision.max_rounds > capacity {
            return Err(RoomError::InvalidProvision(format!(
                "max_rounds {} outside 1..={capacity}",
                provision.max_rounds
            )));
        }
        if provision.participants.len() > self.config.max_participants {
            return Err(RoomError::InvalidProvision(format!(
                "{} seeded participants exceed the limit of {}",
                provision.participants.len(),
                self.config.max_participants
            )));
        }
        let mut keys = HashSet::new();
        if let Some(dup) = provision.participants.iter().find(|seed| !keys.insert(&seed.key)) {
            return Err(RoomError::InvalidProvision(format!("participant {} seeded twice", dup.key)));
        }
        if self.catalog.is_empty() {
            return Err(RoomError::InvalidProvision("entity pool has not been seeded".into()));
        }
        Ok(())
    }

    /// Returns a handle to a live room.
    pub fn room(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms.get(&room_id).cloned().ok_or(RoomError::NotFound(room_id))
    }

    /// Shuts a room down and deletes its ledger keys.
    pub async fn destroy_room(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self.detach(room_id)?;
        Self::teardown(&self.ledger, handle).await
    }

    /// Removes a room from the registry without stopping it. The id is
    /// reported as not found from here on; pass the handle to
    /// [`teardown`](Self::teardown) to finish.
    pub fn detach(&mut self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms.remove(&room_id).ok_or(RoomError::NotFound(room_id))
    }

    /// Stops a detached room's actor and deletes its ledger keys.
    pub async fn teardown(ledger: &PickLedger<S>, handle: RoomHandle) -> Result<(), RoomError> {
        let room_id = handle.room_id();
        // An actor that already stopped is fine; the keys still go.
        let _ = handle.shutdown().await;
        ledger.delete_room(room_id).await?;

        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Live room ids, ascending.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn ledger(&self) -> &PickLedger<S> {
        &self.ledger
    }

    pub fn catalog(&self) -> &Arc<EntityCatalog> {
        &self.catalog
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }
}
