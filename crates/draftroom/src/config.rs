//! Engine configuration.

use draftroom_room::RoomConfig;
use draftroom_transport::PipelineConfig;
use serde::{Deserialize, Serialize};

use crate::DraftroomError;

/// Everything an engine is tuned with. Missing fields take defaults,
/// so `{}` is a valid configuration.
///
/// ```json
/// {
///   "room": { "max_participants": 10, "clock": { "turn_timeout": { "secs": 30, "nanos": 0 } } },
///   "pipeline": { "chunk_size": 25 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub room: RoomConfig,
    pub pipeline: PipelineConfig,
}

impl EngineConfig {
    /// Parses a JSON document and clamps the result.
    pub fn from_json(json: &str) -> Result<Self, DraftroomError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    pub fn validated(self) -> Self {
        Self {
            room: self.room.validated(),
            pipeline: self.pipeline.validated(),
        }
    }
}
