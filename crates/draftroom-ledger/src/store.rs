//! The persistent-store boundary and its in-memory implementation.
//!
//! [`AtomicStore`] is a Redis-shaped surface: sets, hashes, counters,
//! plus one compound operation, [`AtomicStore::check_and_insert`], that
//! a real deployment implements as a server-side script so the
//! existence check, the duplicate check, and every write happen as one
//! unit.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::StoreError;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Everything the pick ledger writes in one atomic step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckAndInsert {
    /// Set the member must already belong to.
    pub master_key: String,
    /// Set the member must not yet belong to, and is added to.
    pub picked_key: String,
    pub member: String,
    /// Hash receiving `member -> data_value`.
    pub data_key: String,
    pub data_value: String,
    /// Hash receiving `member -> sequence`.
    pub order_key: String,
    /// Hash holding the counter and the extra fields below.
    pub stats_key: String,
    pub counter_field: String,
    pub stats_fields: Vec<(String, String)>,
}

/// Result of [`AtomicStore::check_and_insert`]. Checks run in field
/// order: master membership first, then the picked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Written; `sequence` is the counter value after incrementing.
    Inserted { sequence: u64 },
    NotInMaster,
    AlreadyMember,
}

/// The store operations the ledger depends on.
///
/// Every method returns a `Send` future so ledger calls can be awaited
/// from spawned room actors.
pub trait AtomicStore: Send + Sync + 'static {
    /// Adds members to a set, returning how many were new.
    fn set_add(&self, key: &str, members: &[String]) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn set_is_member(&self, key: &str, member: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn set_members(&self, key: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Members of `key` that are not in `minus`.
    fn set_difference(&self, key: &str, minus: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    fn set_card(&self, key: &str) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn hash_set(&self, key: &str, field: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn hash_get(&self, key: &str, field: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn hash_get_all(&self, key: &str) -> impl Future<Output = Result<Vec<(String, String)>, StoreError>> + Send;

    /// Increments an integer field, creating it at zero first.
    fn hash_incr(&self, key: &str, field: &str, by: i64) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Removes keys of any type, returning how many existed.
    fn delete(&self, keys: &[String]) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// The atomic pick primitive. See [`CheckAndInsert`].
    fn check_and_insert(&self, op: &CheckAndInsert) -> impl Future<Output = Result<CheckOutcome, StoreError>> + Send;

    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryData {
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

impl MemoryData {
    fn incr(&mut self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
        let slot = self
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| "0".to_string());
        let current: i64 = slot
            .parse()
            .map_err(|_| StoreError::Corrupt(format!("{key}.{field} is not an integer: {slot:?}")))?;
        let next = current + by;
        *slot = next.to_string();
        Ok(next)
    }
}

/// An in-process [`AtomicStore`].
///
/// A single mutex guards all keys, which is what makes
/// `check_and_insert` atomic here. `set_available(false)` makes every
/// call fail with [`StoreError::Unavailable`], and `with_latency` adds
/// a round-trip delay before each call so concurrent callers interleave
/// the way they would against a networked store.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<MemoryData>,
    unavailable: AtomicBool,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Release);
    }

    /// Simulated round trip, then the lock.
    async fn enter(&self) -> Result<MutexGuard<'_, MemoryData>, StoreError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(self.data.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl AtomicStore for MemoryStore {
    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize, StoreError> {
        let mut data = self.enter().await?;
        let set = data.sets.entry(key.to_string()).or_default();
        Ok(members.iter().filter(|m| set.insert((*m).clone())).count())
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let data = self.enter().await?;
        Ok(data.sets.get(key).is_some_and(|set| set.contains(member)))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let data = self.enter().await?;
        Ok(data
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_difference(&self, key: &str, minus: &str) -> Result<Vec<String>, StoreError> {
        let data = self.enter().await?;
        let Some(base) = data.sets.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match data.sets.get(minus) {
            Some(removed) => base.difference(removed).cloned().collect(),
            None => base.iter().cloned().collect(),
        })
    }

    async fn set_card(&self, key: &str) -> Result<usize, StoreError> {
        let data = self.enter().await?;
        Ok(data.sets.get(key).map_or(0, BTreeSet::len))
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.enter().await?;
        data.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let data = self.enter().await?;
        Ok(data.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        let data = self.enter().await?;
        Ok(data
            .hashes
            .get(key)
            .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn hash_incr(&self, key: &str, field: &str, by: i64) -> Result<i64, StoreError> {
        let mut data = self.enter().await?;
        data.incr(key, field, by)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let data = self.enter().await?;
        Ok(data.sets.contains_key(key) || data.hashes.contains_key(key))
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut data = self.enter().await?;
        let mut removed = 0;
        for key in keys {
            let had_set = data.sets.remove(key).is_some();
            let had_hash = data.hashes.remove(key).is_some();
            if had_set || had_hash {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn check_and_insert(&self, op: &CheckAndInsert) -> Result<CheckOutcome, StoreError> {
        let mut data = self.enter().await?;

        let in_master = data
            .sets
            .get(&op.master_key)
            .is_some_and(|set| set.contains(&op.member));
        if !in_master {
            return Ok(CheckOutcome::NotInMaster);
        }
        let already = data
            .sets
            .get(&op.picked_key)
            .is_some_and(|set| set.contains(&op.member));
        if already {
            return Ok(CheckOutcome::AlreadyMember);
        }

        // Validate the counter before the first write so a corrupt
        // counter leaves nothing half-applied.
        let sequence = data.incr(&op.stats_key, &op.counter_field, 1)?;

        data.sets
            .entry(op.picked_key.clone())
            .or_default()
            .insert(op.member.clone());
        data.hashes
            .entry(op.data_key.clone())
            .or_default()
            .insert(op.member.clone(), op.data_value.clone());
        data.hashes
            .entry(op.order_key.clone())
            .or_default()
            .insert(op.member.clone(), sequence.to_string());
        let stats = data.hashes.entry(op.stats_key.clone()).or_default();
        for (field, value) in &op.stats_fields {
            stats.insert(field.clone(), value.clone());
        }

        Ok(CheckOutcome::Inserted {
            sequence: sequence.max(0) as u64,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.enter().await.map(|_| ())
    }
}
