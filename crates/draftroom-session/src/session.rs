//! The participant record.

use std::time::Instant;

use draftroom_protocol::{EntityId, ParticipantId, ParticipantKey, PickRecord};

/// Whether a participant currently has a connection.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
///
/// There is no expired state: a disconnected participant keeps its
/// seat for the whole draft, and its turns are auto-picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    Connected,
    /// Frozen at the given instant.
    Disconnected { since: Instant },
}

/// One participant in one room.
///
/// `id` is connection-bound and changes on reconnect; `key` never
/// changes. Picks and preferences survive any number of reconnects.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub key: ParticipantKey,
    pub display_name: String,
    pub state: ParticipantState,
    /// In pick order.
    pub picks: Vec<PickRecord>,
    /// Front-to-back priority for auto-pick.
    pub preferences: Vec<EntityId>,
}

impl Participant {
    pub fn new(id: ParticipantId, key: ParticipantKey, display_name: Option<String>) -> Self {
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| key.to_string());
        Self {
            id,
            key,
            display_name,
            state: ParticipantState::Connected,
            picks: Vec::new(),
            preferences: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ParticipantState::Connected)
    }

    /// How long the participant has been disconnected, if it is.
    pub fn disconnected_for(&self) -> Option<std::time::Duration> {
        match self.state {
            ParticipantState::Connected => None,
            ParticipantState::Disconnected { since } => Some(since.elapsed()),
        }
    }

    /// Whether `entity` is already on this participant's roster.
    pub fn has_picked(&self, entity: EntityId) -> bool {
        self.picks.iter().any(|p| p.entity_id == entity)
    }
}
