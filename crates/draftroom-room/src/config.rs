//! Room configuration.

use draftroom_clock::ClockConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings shared by every room a registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Connected participants required to start the draft. Never below 2.
    pub min_participants: usize,

    /// Maximum participants allowed in the room.
    pub max_participants: usize,

    /// Turn and grace timeouts.
    pub clock: ClockConfig,

    /// Shuffle the join order into the base turn order at start.
    pub randomize_order: bool,

    /// How many candidates one auto-pick may try when it keeps losing
    /// races before it gives up and records a no-pick.
    pub auto_pick_attempts: u32,

    /// Command channel capacity of each room actor.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_participants: 2,
            max_participants: 12,
            clock: ClockConfig::default(),
            randomize_order: false,
            auto_pick_attempts: 5,
            channel_size: 64,
        }
    }
}

impl RoomConfig {
    /// Smallest draft that makes sense: a snake needs two ends.
    pub const MIN_PARTICIPANTS: usize = 2;

    /// Clamp and fix any out-of-range values.
    ///
    /// Rules:
    /// - `min_participants` is at least [`Self::MIN_PARTICIPANTS`];
    /// - `max_participants` is at least `min_participants`;
    /// - `auto_pick_attempts` and `channel_size` are at least 1;
    /// - the clock is validated too.
    pub fn validated(mut self) -> Self {
        if self.min_participants < Self::MIN_PARTICIPANTS {
            warn!(
                min_participants = self.min_participants,
                "min_participants below 2, clamping"
            );
            self.min_participants = Self::MIN_PARTICIPANTS;
        }
        if self.max_participants < self.min_participants {
            warn!(
                max_participants = self.max_participants,
                min_participants = self.min_participants,
                "max_participants below min_participants, raising"
            );
            self.max_participants = self.min_participants;
        }
        if self.auto_pick_attempts == 0 {
            warn!("auto_pick_attempts of 0 is invalid, using 1");
            self.auto_pick_attempts = 1;
        }
        if self.channel_size == 0 {
            warn!("channel_size of 0 is invalid, using 1");
            self.channel_size = 1;
        }
        self.clock = self.clock.validated();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_participants, 2);
        assert_eq!(config.max_participants, 12);
        assert_eq!(config.auto_pick_attempts, 5);
        assert_eq!(config.channel_size, 64);
        assert!(!config.randomize_order);
        assert_eq!(config.clock.turn_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_validated_clamps_participant_bounds() {
        let config = RoomConfig {
            min_participants: 1,
            max_participants: 1,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.min_participants, 2);
        assert_eq!(config.max_participants, 2);
    }

    #[test]
    fn test_validated_raises_zero_counts() {
        let config = RoomConfig {
            auto_pick_attempts: 0,
            channel_size: 0,
            ..RoomConfig::default()
        }
        .validated();
        assert_eq!(config.auto_pick_attempts, 1);
        assert_eq!(config.channel_size, 1);
    }

    #[test]
    fn test_deserialize_partial_uses_defaults() {
        let config: RoomConfig = serde_json::from_str(r#"{"max_participants": 4}"#).unwrap();
        assert_eq!(config.max_participants, 4);
        assert_eq!(config.min_participants, 2);
    }
}
