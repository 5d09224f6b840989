//! Outbound events: every state change observers are told about.

use serde::{Deserialize, Serialize};

use crate::{EntityId, ParticipantId, ParticipantKey, PickRecord, PickSource};

/// Which timer is running for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeadlineKind {
    /// The normal turn timer of a connected participant.
    Turn,
    /// The longer timer a disconnected turn owner gets before auto-pick.
    Grace,
}

/// A committed state change, published on the room's channel.
///
/// Internally tagged, so `RoundComplete { round: 2 }` serializes to
/// `{"type":"RoundComplete","round":2}`. The event *name* used on the
/// realtime channel comes from [`DraftEvent::name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DraftEvent {
    ParticipantJoined {
        participant: ParticipantId,
        key: ParticipantKey,
        display_name: String,
    },
    ParticipantLeft {
        participant: ParticipantId,
        key: ParticipantKey,
    },
    ParticipantDisconnected {
        participant: ParticipantId,
        key: ParticipantKey,
        holding_turn: bool,
        /// Set when the participant held the turn and a grace timer started.
        grace_ms: Option<u64>,
    },
    ParticipantReconnected {
        previous: ParticipantId,
        participant: ParticipantId,
        key: ParticipantKey,
    },
    PreferencesUpdated {
        participant: ParticipantId,
        preferences: Vec<EntityId>,
    },
    DraftStarted {
        turn_order: Vec<ParticipantId>,
        max_rounds: u32,
    },
    TurnStarted {
        participant: ParticipantId,
        round: u32,
        turn_index: usize,
        kind: DeadlineKind,
        time_left_ms: u64,
    },
    PickMade {
        record: PickRecord,
        source: PickSource,
    },
    NoPick {
        participant: ParticipantId,
        round: u32,
        turn_index: usize,
        reason: String,
    },
    RoundComplete {
        round: u32,
    },
    DraftComplete {
        total_picks: u64,
    },
}

impl DraftEvent {
    /// The realtime event name. Automatic picks are published under a
    /// different name from manual ones.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParticipantJoined { .. } => "participant-joined",
            Self::ParticipantLeft { .. } => "participant-left",
            Self::ParticipantDisconnected { .. } => "participant-disconnected",
            Self::ParticipantReconnected { .. } => "participant-reconnected",
            Self::PreferencesUpdated { .. } => "preferences-updated",
            Self::DraftStarted { .. } => "draft-started",
            Self::TurnStarted { .. } => "turn-started",
            Self::PickMade { record, .. } if record.was_automatic => "auto-pick-made",
            Self::PickMade { .. } => "pick-made",
            Self::NoPick { .. } => "no-pick",
            Self::RoundComplete { .. } => "round-complete",
            Self::DraftComplete { .. } => "draft-complete",
        }
    }
}
