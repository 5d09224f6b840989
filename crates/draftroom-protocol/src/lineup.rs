//! Lineup configuration: which roster slots exist and how many of each.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Category, ProtocolError};

// ---------------------------------------------------------------------------
// RosterSlot
// ---------------------------------------------------------------------------

/// A named roster position.
///
/// Serialized as its bare name: `"QB"`, `"FLEX"`, `"BENCH"`. Any name
/// other than the two reserved ones is a primary slot for the category
/// of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RosterSlot {
    Primary(Category),
    Flex,
    Bench,
}

impl RosterSlot {
    pub const FLEX: &'static str = "FLEX";
    pub const BENCH: &'static str = "BENCH";

    pub fn parse(name: &str) -> Self {
        let category = Category::new(name);
        match category.as_str() {
            Self::FLEX => Self::Flex,
            Self::BENCH => Self::Bench,
            _ => Self::Primary(category),
        }
    }

    /// The slot an entity of `category` is counted against when a pick
    /// carries no explicit slot.
    pub fn primary(category: &Category) -> Self {
        Self::parse(category.as_str())
    }
}

impl From<String> for RosterSlot {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<&str> for RosterSlot {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<RosterSlot> for String {
    fn from(slot: RosterSlot) -> Self {
        slot.to_string()
    }
}

impl fmt::Display for RosterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary(category) => f.write_str(category.as_str()),
            Self::Flex => f.write_str(Self::FLEX),
            Self::Bench => f.write_str(Self::BENCH),
        }
    }
}

// ---------------------------------------------------------------------------
// LineupConfig
// ---------------------------------------------------------------------------

/// Occupancy bounds for one declared slot.
///
/// Field aliases accept the contest database's `position` /
/// `minDraftable` / `maxDraftable` naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLimit {
    #[serde(alias = "position")]
    pub slot: RosterSlot,
    #[serde(alias = "minDraftable")]
    pub min: u32,
    #[serde(alias = "maxDraftable")]
    pub max: u32,
}

impl SlotLimit {
    pub fn new(slot: impl Into<RosterSlot>, min: u32, max: u32) -> Self {
        Self {
            slot: slot.into(),
            min,
            max,
        }
    }
}

/// The shape every participant's roster must fit.
///
/// Slots are listed in display order. Bench capacity is kept apart from
/// the slot list because the bench accepts any category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupConfig {
    pub slots: Vec<SlotLimit>,
    /// Categories that may fill the FLEX slot.
    #[serde(default)]
    pub flex_eligible: BTreeSet<Category>,
    #[serde(default)]
    pub bench_capacity: u32,
}

impl LineupConfig {
    /// A standard football lineup: QB, 2 RB, 2 WR, TE, FLEX (RB/WR/TE),
    /// K, DST and a six-deep bench.
    pub fn standard() -> Self {
        Self {
            slots: vec![
                SlotLimit::new("QB", 1, 1),
                SlotLimit::new("RB", 2, 2),
                SlotLimit::new("WR", 2, 2),
                SlotLimit::new("TE", 1, 1),
                SlotLimit::new(RosterSlot::Flex, 1, 1),
                SlotLimit::new("K", 1, 1),
                SlotLimit::new("DST", 1, 1),
            ],
            flex_eligible: ["RB", "WR", "TE"].into_iter().map(Category::new).collect(),
            bench_capacity: 6,
        }
    }

    /// Checks the structural rules a room relies on.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidLineup`] when the lineup is
    /// empty, a slot is declared twice, a slot has `min > max`, the
    /// bench is declared as a slot, or FLEX eligibility and the FLEX
    /// slot disagree.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.slots.is_empty() {
            return Err(ProtocolError::InvalidLineup("no slots declared".into()));
        }

        let mut seen = HashSet::new();
        for limit in &self.slots {
            if limit.slot == RosterSlot::Bench {
                return Err(ProtocolError::InvalidLineup(
                    "bench is configured through bench_capacity, not as a slot".into(),
                ));
            }
            if !seen.insert(&limit.slot) {
                return Err(ProtocolError::InvalidLineup(format!(
                    "slot {} declared twice",
                    limit.slot
                )));
            }
            if limit.min > limit.max {
                return Err(ProtocolError::InvalidLineup(format!(
                    "slot {} has min {} above max {}",
                    limit.slot, limit.min, limit.max
                )));
            }
        }

        let has_flex = seen.contains(&RosterSlot::Flex);
        if has_flex && self.flex_eligible.is_empty() {
            return Err(ProtocolError::InvalidLineup(
                "FLEX slot declared without eligible categories".into(),
            ));
        }
        if !has_flex && !self.flex_eligible.is_empty() {
            return Err(ProtocolError::InvalidLineup(
                "FLEX eligibility given without a FLEX slot".into(),
            ));
        }

        match self.checked_capacity() {
            None => Err(ProtocolError::InvalidLineup("total slot capacity overflows".into())),
            Some(0) => Err(ProtocolError::InvalidLineup("lineup holds no picks".into())),
            Some(_) => Ok(()),
        }
    }

    /// Maximum occupancy of `slot`. Undeclared slots hold nothing.
    pub fn max_for(&self, slot: &RosterSlot) -> u32 {
        if *slot == RosterSlot::Bench {
            return self.bench_capacity;
        }
        self.slots
            .iter()
            .find(|limit| &limit.slot == slot)
            .map_or(0, |limit| limit.max)
    }

    pub fn is_flex_eligible(&self, category: &Category) -> bool {
        self.flex_eligible.contains(category)
    }

    /// Total picks one roster can hold, saturating at `u32::MAX`.
    /// A lineup that passed [`validate`](Self::validate) never saturates.
    pub fn capacity(&self) -> u32 {
        self.checked_capacity().unwrap_or(u32::MAX)
    }

    fn checked_capacity(&self) -> Option<u32> {
        self.slots
            .iter()
            .try_fold(self.bench_capacity, |total, limit| total.checked_add(limit.max))
    }
}
