//! Core domain types shared by every Draftroom crate.
//!
//! These are the structures that cross crate boundaries and, in most
//! cases, the wire: ids, the canonical entity shape, pick records, and
//! the provisioning input that creates a room.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{LineupConfig, ProtocolError, RosterSlot};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a room (one draft session).
///
/// Newtype wrapper over `u64`: the compiler stops a `RoomId` from being
/// passed where an [`EntityId`] is expected, even though both are plain
/// numbers underneath. `#[serde(transparent)]` keeps the JSON form a
/// bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// A connection-bound participant identity.
///
/// This id changes every time a participant reconnects. Anything that
/// must survive a reconnect is keyed by [`ParticipantKey`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A draftable entity's stable id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The stable external key a participant is known by (a username).
///
/// Matching is case-insensitive, so the key is lowercased and trimmed
/// on construction. Two keys that differ only in case are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ParticipantKey(String);

impl ParticipantKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ParticipantKey {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for ParticipantKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ParticipantKey> for String {
    fn from(key: ParticipantKey) -> Self {
        key.0
    }
}

impl fmt::Display for ParticipantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// An entity's roster-eligibility category, e.g. `QB` or `WR`.
///
/// Uppercased on construction so `"wr"` from one feed and `"WR"` from
/// another land in the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Category(String);

impl Category {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The canonical shape of a draftable entity inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub category: Category,
}

impl Entity {
    pub fn new(id: u64, category: impl AsRef<str>) -> Self {
        Self {
            id: EntityId(id),
            category: Category::new(category),
        }
    }
}

/// An entity id as provisioning feeds deliver it: sometimes a number,
/// sometimes a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

/// An entity exactly as the pool collaborator hands it over.
///
/// Feeds disagree on field names and casing (`PlayerID` vs `playerId`,
/// `Position` vs `position`). Every spelling is accepted here and
/// [`Entity::try_from`] produces the one canonical shape. Unknown
/// fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntity {
    #[serde(
        alias = "PlayerID",
        alias = "playerId",
        alias = "player_id",
        alias = "entityId",
        alias = "entity_id"
    )]
    id: RawId,

    #[serde(default, alias = "Position", alias = "position")]
    category: Option<String>,
}

impl TryFrom<RawEntity> for Entity {
    type Error = ProtocolError;

    fn try_from(raw: RawEntity) -> Result<Self, Self::Error> {
        let id = match raw.id {
            RawId::Number(n) => n,
            RawId::Text(text) => text.trim().parse().map_err(|_| {
                ProtocolError::InvalidEntity(format!("non-numeric id {text:?}"))
            })?,
        };
        let category = raw
            .category
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProtocolError::InvalidEntity(format!("entity {id} has no category")))?;
        Ok(Entity::new(id, category))
    }
}

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

/// How an entity ended up on a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PickSource {
    /// The participant chose it.
    Manual,
    /// Auto-pick took the `rank`-th (0-based) entry of the preference list.
    Preference { rank: usize },
    /// Auto-pick fell back to the lowest-id legal entity.
    LowestAvailable,
}

impl PickSource {
    pub fn is_automatic(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

/// One committed pick. Immutable once the ledger has accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRecord {
    pub entity_id: EntityId,
    pub category: Category,
    pub participant_id: ParticipantId,
    pub participant_key: ParticipantKey,
    pub round: u32,
    /// 1-based position of this pick across the whole room.
    pub pick_number: u64,
    pub slot: RosterSlot,
    pub timestamp_ms: u64,
    pub was_automatic: bool,
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

/// A participant the contest provisioning expects in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSeed {
    pub key: ParticipantKey,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ParticipantSeed {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self {
            key: ParticipantKey::new(key),
            display_name: None,
        }
    }
}

/// Everything needed to create a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomProvision {
    pub room_id: RoomId,
    /// Keys allowed to join. Empty means the room is open to any key.
    #[serde(default)]
    pub participants: Vec<ParticipantSeed>,
    pub lineup: LineupConfig,
    pub max_rounds: u32,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The broadcast channel a room's events are published on.
pub fn room_channel(room_id: RoomId) -> String {
    format!("draft-room-{}", room_id.0)
}

/// Wall-clock milliseconds since the Unix epoch, for pick timestamps.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
