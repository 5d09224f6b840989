//! The atomic pick ledger.
//!
//! The ledger owns the "available vs. picked" partition of each room.
//! Availability is always computed from the store at call time:
//!
//! ```text
//! available(room) = master set (optionally one category)  −  room's picked set
//! ```
//!
//! Store layout:
//!
//! ```text
//! draft:master_list                 set   every entity id
//! draft:master_categories:{CAT}     set   entity ids of one category
//! draft:entity_data                 hash  id -> category
//! draft:room:{id}:picked_ids        set   ids picked in the room
//! draft:room:{id}:picks_data        hash  id -> pick record (JSON)
//! draft:room:{id}:picks_order       hash  id -> pick number
//! draft:room:{id}:stats             hash  totalPicks, lastPickTime, currentRound, createdAt
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use draftroom_protocol::{
    Category, EntityId, ParticipantId, ParticipantKey, PickRecord, RoomId, RosterSlot,
    unix_millis,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{AtomicStore, CheckAndInsert, CheckOutcome, EntityCatalog, LedgerError, PickError, StoreError};

const MASTER_LIST: &str = "draft:master_list";
const ENTITY_DATA: &str = "draft:entity_data";

const TOTAL_PICKS: &str = "totalPicks";
const LAST_PICK_TIME: &str = "lastPickTime";
const CURRENT_ROUND: &str = "currentRound";
const CREATED_AT: &str = "createdAt";

fn master_category_key(category: &Category) -> String {
    format!("draft:master_categories:{category}")
}

fn room_key(room_id: RoomId, suffix: &str) -> String {
    format!("draft:room:{}:{suffix}", room_id.0)
}

fn parse_id(raw: &str) -> Result<EntityId, StoreError> {
    raw.parse()
        .map(EntityId)
        .map_err(|_| StoreError::Corrupt(format!("entity id {raw:?} is not numeric")))
}

fn parse_u64(raw: Option<String>, field: &str) -> Result<Option<u64>, StoreError> {
    raw.map(|v| {
        v.parse()
            .map_err(|_| StoreError::Corrupt(format!("{field} is not numeric: {v:?}")))
    })
    .transpose()
}

/// Everything that goes into one pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub room_id: RoomId,
    pub entity_id: EntityId,
    pub category: Category,
    pub participant_id: ParticipantId,
    pub participant_key: ParticipantKey,
    pub round: u32,
    pub slot: RosterSlot,
    pub automatic: bool,
}

/// Progress counters for one room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoomStats {
    pub total_picks: u64,
    pub last_pick_at_ms: Option<u64>,
    pub current_round: u32,
    pub created_at_ms: Option<u64>,
}

/// The authoritative pick ledger. Cheap to clone; clones share the store.
pub struct PickLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for PickLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AtomicStore> PickLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Loads the catalog into the master sets. Re-seeding is additive.
    pub async fn seed_master(&self, catalog: &EntityCatalog) -> Result<usize, StoreError> {
        let all: Vec<String> = catalog.iter().map(|e| e.id.to_string()).collect();
        let added = self.store.set_add(MASTER_LIST, &all).await?;

        for category in catalog.categories() {
            let members: Vec<String> = catalog
                .iter()
                .filter(|e| e.category == category)
                .map(|e| e.id.to_string())
                .collect();
            self.store.set_add(&master_category_key(&category), &members).await?;
        }
        for entity in catalog.iter() {
            self.store
                .hash_set(ENTITY_DATA, &entity.id.to_string(), entity.category.as_str())
                .await?;
        }

        info!(entities = catalog.len(), added, "master pool seeded");
        Ok(added)
    }

    /// Registers a room in the store.
    ///
    /// # Errors
    /// [`LedgerError::RoomExists`] if the store already holds stats for
    /// this id.
    pub async fn create_room(&self, room_id: RoomId) -> Result<(), LedgerError> {
        let stats = room_key(room_id, "stats");
        if self.store.exists(&stats).await? {
            return Err(LedgerError::RoomExists(room_id));
        }
        self.store.hash_set(&stats, TOTAL_PICKS, "0").await?;
        self.store.hash_set(&stats, CURRENT_ROUND, "1").await?;
        self.store
            .hash_set(&stats, CREATED_AT, &unix_millis().to_string())
            .await?;
        debug!(%room_id, "room registered in ledger");
        Ok(())
    }

    /// Records a pick, all or nothing.
    ///
    /// # Errors
    /// - [`PickError::EntityUnknown`]: the entity is not in the master set.
    /// - [`PickError::AlreadyPicked`]: the entity is in this room's picked set.
    /// - [`PickError::StoreUnavailable`]: nothing was written.
    pub async fn pick(&self, request: PickRequest) -> Result<PickRecord, PickError> {
        let timestamp_ms = unix_millis();
        let mut record = PickRecord {
            entity_id: request.entity_id,
            category: request.category,
            participant_id: request.participant_id,
            participant_key: request.participant_key,
            round: request.round,
            pick_number: 0,
            slot: request.slot,
            timestamp_ms,
            was_automatic: request.automatic,
        };
        // Stored without its number; the number lives in picks_order.
        let data_value = serde_json::to_string(&record)
            .map_err(|e| StoreError::Corrupt(format!("pick record not serializable: {e}")))?;

        let op = CheckAndInsert {
            master_key: MASTER_LIST.to_string(),
            picked_key: room_key(request.room_id, "picked_ids"),
            member: request.entity_id.to_string(),
            data_key: room_key(request.room_id, "picks_data"),
            data_value,
            order_key: room_key(request.room_id, "picks_order"),
            stats_key: room_key(request.room_id, "stats"),
            counter_field: TOTAL_PICKS.to_string(),
            stats_fields: vec![
                (LAST_PICK_TIME.to_string(), timestamp_ms.to_string()),
                (CURRENT_ROUND.to_string(), request.round.to_string()),
            ],
        };

        match self.store.check_and_insert(&op).await? {
            CheckOutcome::Inserted { sequence } => {
                record.pick_number = sequence;
                info!(
                    room_id = %request.room_id,
                    participant = %record.participant_id,
                    entity = %record.entity_id,
                    slot = %record.slot,
                    pick = sequence,
                    automatic = record.was_automatic,
                    "pick recorded"
                );
                Ok(record)
            }
            CheckOutcome::NotInMaster => Err(PickError::EntityUnknown(request.entity_id)),
            CheckOutcome::AlreadyMember => {
                debug!(room_id = %request.room_id, entity = %request.entity_id, "pick lost race");
                Err(PickError::AlreadyPicked(request.entity_id))
            }
        }
    }

    /// Entities still available in the room, straight from the store.
    pub async fn available_entities(
        &self,
        room_id: RoomId,
        category: Option<&Category>,
    ) -> Result<BTreeSet<EntityId>, StoreError> {
        let source = match category {
            Some(category) => master_category_key(category),
            None => MASTER_LIST.to_string(),
        };
        self.store
            .set_difference(&source, &room_key(room_id, "picked_ids"))
            .await?
            .iter()
            .map(|raw| parse_id(raw))
            .collect()
    }

    pub async fn is_available(&self, room_id: RoomId, entity_id: EntityId) -> Result<bool, StoreError> {
        let member = entity_id.to_string();
        if !self.store.set_is_member(MASTER_LIST, &member).await? {
            return Ok(false);
        }
        let picked = self
            .store
            .set_is_member(&room_key(room_id, "picked_ids"), &member)
            .await?;
        Ok(!picked)
    }

    /// Every pick in the room, in pick order.
    pub async fn pick_history(&self, room_id: RoomId) -> Result<Vec<PickRecord>, StoreError> {
        let data = self.store.hash_get_all(&room_key(room_id, "picks_data")).await?;
        let order = self.store.hash_get_all(&room_key(room_id, "picks_order")).await?;
        let order: std::collections::HashMap<String, String> = order.into_iter().collect();

        let mut records = Vec::with_capacity(data.len());
        for (member, json) in data {
            let mut record: PickRecord = serde_json::from_str(&json)
                .map_err(|e| StoreError::Corrupt(format!("pick {member}: {e}")))?;
            record.pick_number = parse_u64(order.get(&member).cloned(), "pick number")?.unwrap_or(0);
            records.push(record);
        }
        records.sort_by_key(|r| r.pick_number);
        Ok(records)
    }

    pub async fn room_stats(&self, room_id: RoomId) -> Result<RoomStats, StoreError> {
        let stats = room_key(room_id, "stats");
        let total_picks = parse_u64(self.store.hash_get(&stats, TOTAL_PICKS).await?, TOTAL_PICKS)?;
        let last_pick_at_ms = parse_u64(self.store.hash_get(&stats, LAST_PICK_TIME).await?, LAST_PICK_TIME)?;
        let current_round = parse_u64(self.store.hash_get(&stats, CURRENT_ROUND).await?, CURRENT_ROUND)?;
        let created_at_ms = parse_u64(self.store.hash_get(&stats, CREATED_AT).await?, CREATED_AT)?;
        Ok(RoomStats {
            total_picks: total_picks.unwrap_or(0),
            last_pick_at_ms,
            current_round: current_round.unwrap_or(1) as u32,
            created_at_ms,
        })
    }

    /// Removes every key the room owns. The master pool is untouched.
    pub async fn delete_room(&self, room_id: RoomId) -> Result<(), StoreError> {
        let keys: Vec<String> = ["picked_ids", "picks_data", "picks_order", "stats"]
            .into_iter()
            .map(|suffix| room_key(room_id, suffix))
            .collect();
        let removed = self.store.delete(&keys).await?;
        info!(%room_id, removed, "room deleted from ledger");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}
