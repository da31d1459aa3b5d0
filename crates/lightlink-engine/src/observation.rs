//! Observation set: what a coordinator currently watches
//!
//! Owned exclusively by one coordinator and rebuilt in full on every
//! (re)subscribe; membership changes never mutate it partially.

use std::collections::{HashMap, HashSet};

use lightlink_core::EntityId;

/// The entities one coordinator observes, plus resolved group membership
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationSet {
    watched: HashSet<EntityId>,
    groups: HashMap<EntityId, HashSet<EntityId>>,
}

impl ObservationSet {
    /// Build an observation set from a watch set and group membership
    pub fn new(watched: HashSet<EntityId>, groups: HashMap<EntityId, HashSet<EntityId>>) -> Self {
        Self { watched, groups }
    }

    /// All watched entity ids
    pub fn watched(&self) -> &HashSet<EntityId> {
        &self.watched
    }

    /// Whether an entity is in the watch set
    pub fn is_watched(&self, entity_id: &EntityId) -> bool {
        self.watched.contains(entity_id)
    }

    /// Whether an entity is a tracked group
    pub fn is_group(&self, entity_id: &EntityId) -> bool {
        self.groups.contains_key(entity_id)
    }

    /// The group entities whose resolved membership contains `entity_id`
    pub fn groups_containing<'a>(
        &'a self,
        entity_id: &'a EntityId,
    ) -> impl Iterator<Item = &'a EntityId> {
        self.groups
            .iter()
            .filter(move |(_, members)| members.contains(entity_id))
            .map(|(group, _)| group)
    }

    /// Whether nothing is watched
    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Drop everything; used on teardown
    pub fn clear(&mut self) {
        self.watched.clear();
        self.groups.clear();
    }
}
