//! The session manager: everyone who has joined one room.
//!
//! Live participants and frozen (disconnected) ones are kept in separate
//! maps, both keyed by the id they were last known by. The key index
//! always points at a participant's current id, so a reconnect can find
//! the frozen record from the username alone.
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself. It is owned by a room
//! actor and only ever touched from that actor's task.

use std::collections::HashMap;
use std::time::Instant;

use draftroom_protocol::{EntityId, ParticipantId, ParticipantKey, PickRecord};
use tracing::{debug, info};

use crate::{Participant, ParticipantState, SessionError};

/// Outcome of a successful reconnect.
#[derive(Debug)]
pub struct Reattached<'a> {
    /// The id the participant had before disconnecting.
    pub previous: ParticipantId,
    pub participant: &'a Participant,
}

/// Tracks the participants of a single room.
///
/// ## Lifecycle
///
/// ```text
/// join() ──→ [active] ──disconnect()──→ [frozen] ──reconnect(key, new id)──→ [active]
///               │
///               └──remove()──→ gone (only before the draft starts)
/// ```
#[derive(Debug, Default)]
pub struct SessionManager {
    active: HashMap<ParticipantId, Participant>,
    frozen: HashMap<ParticipantId, Participant>,
    /// Stable key to current id, live or frozen.
    keys: HashMap<ParticipantKey, ParticipantId>,
    /// Current ids in join order. Reconnects replace in place.
    join_order: Vec<ParticipantId>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a newly connected participant.
    ///
    /// # Errors
    /// - [`SessionError::IdInUse`]: the connection id is taken.
    /// - [`SessionError::AlreadyConnected`]: the key has a live connection.
    /// - [`SessionError::MustReconnect`]: the key is frozen.
    pub fn join(
        &mut self,
        id: ParticipantId,
        key: ParticipantKey,
        display_name: Option<String>,
    ) -> Result<&Participant, SessionError> {
        if self.contains(id) {
            return Err(SessionError::IdInUse(id));
        }
        if let Some(existing) = self.keys.get(&key) {
            return Err(if self.frozen.contains_key(existing) {
                SessionError::MustReconnect(key)
            } else {
                SessionError::AlreadyConnected(key)
            });
        }

        let participant = Participant::new(id, key.clone(), display_name);
        info!(participant = %id, %key, "participant joined");
        self.keys.insert(key, id);
        self.join_order.push(id);
        Ok(self.active.entry(id).or_insert(participant))
    }

    /// Removes a participant entirely, live or frozen.
    pub fn remove(&mut self, id: ParticipantId) -> Result<Participant, SessionError> {
        let participant = self
            .active
            .remove(&id)
            .or_else(|| self.frozen.remove(&id))
            .ok_or(SessionError::NotFound(id))?;
        self.keys.remove(&participant.key);
        self.join_order.retain(|p| *p != id);
        info!(participant = %id, key = %participant.key, "participant removed");
        Ok(participant)
    }

    /// Freezes a live participant. Its picks and preferences are kept.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if `id` is not live.
    pub fn disconnect(&mut self, id: ParticipantId) -> Result<&Participant, SessionError> {
        let mut participant = self.active.remove(&id).ok_or(SessionError::NotFound(id))?;
        participant.state = ParticipantState::Disconnected { since: Instant::now() };
        info!(
            participant = %id,
            key = %participant.key,
            picks = participant.picks.len(),
            "participant frozen"
        );
        Ok(self.frozen.entry(id).or_insert(participant))
    }

    /// Re-attaches the frozen participant known by `key` to `new_id`.
    ///
    /// The join order keeps the participant's position, so callers
    /// holding a turn order can swap `previous` for `new_id` in place.
    ///
    /// # Errors
    /// - [`SessionError::UnknownKey`]: nobody with this key joined.
    /// - [`SessionError::AlreadyConnected`]: the key is live.
    /// - [`SessionError::IdInUse`]: `new_id` is taken by someone else.
    pub fn reconnect(
        &mut self,
        key: &ParticipantKey,
        new_id: ParticipantId,
    ) -> Result<Reattached<'_>, SessionError> {
        let previous = *self
            .keys
            .get(key)
            .ok_or_else(|| SessionError::UnknownKey(key.clone()))?;
        if self.active.contains_key(&previous) {
            return Err(SessionError::AlreadyConnected(key.clone()));
        }
        if new_id != previous && self.contains(new_id) {
            return Err(SessionError::IdInUse(new_id));
        }

        let mut participant = self
            .frozen
            .remove(&previous)
            .ok_or_else(|| SessionError::UnknownKey(key.clone()))?;
        let away = participant.disconnected_for().unwrap_or_default();
        participant.id = new_id;
        participant.state = ParticipantState::Connected;
        for pick in &mut participant.picks {
            pick.participant_id = new_id;
        }

        self.keys.insert(key.clone(), new_id);
        for slot in &mut self.join_order {
            if *slot == previous {
                *slot = new_id;
            }
        }
        info!(
            %previous,
            participant = %new_id,
            %key,
            away_ms = away.as_millis() as u64,
            "participant reconnected"
        );

        Ok(Reattached {
            previous,
            participant: self.active.entry(new_id).or_insert(participant),
        })
    }

    /// Appends a committed pick to the participant's roster.
    pub fn record_pick(&mut self, id: ParticipantId, record: PickRecord) -> Result<(), SessionError> {
        let participant = self.get_mut(id).ok_or(SessionError::NotFound(id))?;
        debug!(participant = %id, entity = %record.entity_id, "pick added to roster");
        participant.picks.push(record);
        Ok(())
    }

    /// Replaces the preference list, dropping repeats but keeping the
    /// first occurrence's position. Returns the stored list.
    pub fn set_preferences(
        &mut self,
        id: ParticipantId,
        preferences: impl IntoIterator<Item = EntityId>,
    ) -> Result<&[EntityId], SessionError> {
        let participant = self.get_mut(id).ok_or(SessionError::NotFound(id))?;
        let mut deduped: Vec<EntityId> = Vec::new();
        for entity in preferences {
            if !deduped.contains(&entity) {
                deduped.push(entity);
            }
        }
        participant.preferences = deduped;
        Ok(&participant.preferences)
    }

    /// Looks a participant up by id, live or frozen.
    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.active.get(&id).or_else(|| self.frozen.get(&id))
    }

    fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        match self.active.get_mut(&id) {
            Some(participant) => Some(participant),
            None => self.frozen.get_mut(&id),
        }
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.active.contains_key(&id) || self.frozen.contains_key(&id)
    }

    pub fn is_connected(&self, id: ParticipantId) -> bool {
        self.active.contains_key(&id)
    }

    /// Current id of the participant known by `key`.
    pub fn id_for_key(&self, key: &ParticipantKey) -> Option<ParticipantId> {
        self.keys.get(key).copied()
    }

    /// Whether `key` belongs to a frozen participant.
    pub fn is_frozen_key(&self, key: &ParticipantKey) -> bool {
        self.keys
            .get(key)
            .is_some_and(|id| self.frozen.contains_key(id))
    }

    /// Current ids in join order.
    pub fn ordered_ids(&self) -> &[ParticipantId] {
        &self.join_order
    }

    /// Every participant in join order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.join_order.iter().filter_map(|id| self.get(*id))
    }

    pub fn connected_count(&self) -> usize {
        self.active.len()
    }

    pub fn len(&self) -> usize {
        self.join_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.join_order.is_empty()
    }
}
