//! The entity catalog: immutable metadata for the seeded pool.

use std::collections::{BTreeMap, BTreeSet};

use draftroom_protocol::{Category, Entity, EntityId, ProtocolError};

/// Every draftable entity, by id.
///
/// Holds metadata only (an entity's category). Whether an entity is
/// still available is never answered here; that is the ledger's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCatalog {
    entities: BTreeMap<EntityId, Entity>,
}

impl EntityCatalog {
    /// Builds a catalog from canonical entities.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidEntity`] if one id appears with two
    /// different categories.
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Result<Self, ProtocolError> {
        let mut map: BTreeMap<EntityId, Entity> = BTreeMap::new();
        for entity in entities {
            if let Some(existing) = map.get(&entity.id) {
                if *existing != entity {
                    return Err(ProtocolError::InvalidEntity(format!(
                        "entity {} listed as both {} and {}",
                        entity.id, existing.category, entity.category
                    )));
                }
                continue;
            }
            map.insert(entity.id, entity);
        }
        Ok(Self { entities: map })
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn categories(&self) -> BTreeSet<Category> {
        self.entities.values().map(|e| e.category.clone()).collect()
    }
}
