//! Auto-pick candidate selection.
//!
//! Preference list first, front to back. Then the lowest-id entity that
//! fits the roster. Both steps use the same validator as manual picks,
//! so an automatic pick can never land somewhere a manual one couldn't.

use std::collections::BTreeSet;

use draftroom_ledger::EntityCatalog;
use draftroom_protocol::{Entity, EntityId, LineupConfig, PickRecord, PickSource, RosterSlot};

use crate::roster::{Placement, place};

pub(crate) const POOL_EXHAUSTED: &str = "pool exhausted";
pub(crate) const NO_LEGAL_SLOT: &str = "no legal roster slot";

/// What auto-pick should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    Pick {
        entity: Entity,
        slot: RosterSlot,
        source: PickSource,
    },
    /// Skip the turn.
    NoPick { reason: String },
}

/// Chooses an auto-pick candidate from `available`.
///
/// Entities missing from the catalog are never chosen.
pub fn select_fallback(
    preferences: &[EntityId],
    available: &BTreeSet<EntityId>,
    catalog: &EntityCatalog,
    picks: &[PickRecord],
    lineup: &LineupConfig,
) -> Fallback {
    let legal = |id: &EntityId| {
        let entity = catalog.get(id)?;
        match place(picks, entity, lineup) {
            Placement::Accepted(slot) => Some((entity.clone(), slot)),
            Placement::Rejected { .. } => None,
        }
    };

    for (rank, id) in preferences.iter().enumerate() {
        if !available.contains(id) {
            continue;
        }
        if let Some((entity, slot)) = legal(id) {
            return Fallback::Pick {
                entity,
                slot,
                source: PickSource::Preference { rank },
            };
        }
    }

    if let Some((entity, slot)) = available.iter().find_map(legal) {
        return Fallback::Pick {
            entity,
            slot,
            source: PickSource::LowestAvailable,
        };
    }

    let reason = if available.iter().any(|id| catalog.contains(id)) {
        NO_LEGAL_SLOT
    } else {
        POOL_EXHAUSTED
    };
    Fallback::NoPick {
        reason: reason.to_string(),
    }
}
