//! Roster slot validation.
//!
//! [`place`] decides where a candidate entity would sit on a roster.
//! The order is fixed: the entity's own category slot, then FLEX if the
//! category is eligible, then the bench. It is a pure function of the
//! current picks and the lineup, so the same history always yields the
//! same slot.

use std::collections::HashMap;

use draftroom_protocol::{Category, Entity, LineupConfig, PickRecord, RosterSlot};
use serde::Serialize;

/// Something that occupies a roster position.
pub trait RosterEntry {
    fn category(&self) -> &Category;

    /// The slot this entry was assigned, if any. Unassigned entries are
    /// counted against their category's primary slot.
    fn assigned_slot(&self) -> Option<&RosterSlot>;
}

impl RosterEntry for PickRecord {
    fn category(&self) -> &Category {
        &self.category
    }

    fn assigned_slot(&self) -> Option<&RosterSlot> {
        Some(&self.slot)
    }
}

impl RosterEntry for Entity {
    fn category(&self) -> &Category {
        &self.category
    }

    fn assigned_slot(&self) -> Option<&RosterSlot> {
        None
    }
}

/// Outcome of [`place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Accepted(RosterSlot),
    Rejected { reason: String },
}

impl Placement {
    pub fn slot(&self) -> Option<&RosterSlot> {
        match self {
            Self::Accepted(slot) => Some(slot),
            Self::Rejected { .. } => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Remaining room in one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOpening {
    pub slot: RosterSlot,
    pub filled: u32,
    pub max: u32,
}

impl SlotOpening {
    pub fn open(&self) -> u32 {
        self.max.saturating_sub(self.filled)
    }
}

/// Occupancy per slot.
pub fn slot_counts<E: RosterEntry>(picks: &[E]) -> HashMap<RosterSlot, u32> {
    let mut counts = HashMap::new();
    for pick in picks {
        let slot = pick
            .assigned_slot()
            .cloned()
            .unwrap_or_else(|| RosterSlot::primary(pick.category()));
        *counts.entry(slot).or_insert(0) += 1;
    }
    counts
}

/// Decides where `candidate` would go on a roster holding `picks`.
pub fn place<E: RosterEntry>(picks: &[E], candidate: &Entity, lineup: &LineupConfig) -> Placement {
    let counts = slot_counts(picks);
    let has_room = |slot: &RosterSlot| counts.get(slot).copied().unwrap_or(0) < lineup.max_for(slot);

    let primary = RosterSlot::primary(&candidate.category);
    if has_room(&primary) {
        return Placement::Accepted(primary);
    }
    if lineup.is_flex_eligible(&candidate.category) && has_room(&RosterSlot::Flex) {
        return Placement::Accepted(RosterSlot::Flex);
    }
    if has_room(&RosterSlot::Bench) {
        return Placement::Accepted(RosterSlot::Bench);
    }
    Placement::Rejected {
        reason: format!("no open roster spot for category {}", candidate.category),
    }
}

/// Every declared slot plus the bench, in lineup order, with occupancy.
pub fn open_slots<E: RosterEntry>(picks: &[E], lineup: &LineupConfig) -> Vec<SlotOpening> {
    let counts = slot_counts(picks);
    let filled = |slot: &RosterSlot| counts.get(slot).copied().unwrap_or(0);

    let mut openings: Vec<SlotOpening> = lineup
        .slots
        .iter()
        .map(|limit| SlotOpening {
            slot: limit.slot.clone(),
            filled: filled(&limit.slot),
            max: limit.max,
        })
        .collect();
    if lineup.bench_capacity > 0 {
        openings.push(SlotOpening {
            slot: RosterSlot::Bench,
            filled: filled(&RosterSlot::Bench),
            max: lineup.bench_capacity,
        });
    }
    openings
}
