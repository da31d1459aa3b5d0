//! Entity classifier
//!
//! Splits a set of entity ids into plain entities and group entities, and
//! resolves each group to its current member set using host state lookups.
//! Classification is re-run every time a coordinator (re)subscribes and is
//! never cached beyond that, so membership is always current.

use std::collections::{HashMap, HashSet};

use lightlink_core::EntityId;
use lightlink_host::HostApi;
use tracing::warn;

/// The outcome of classifying a set of entity ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    /// Entities without group membership
    pub plain: HashSet<EntityId>,
    /// Group entity id → current resolved member set
    pub groups: HashMap<EntityId, HashSet<EntityId>>,
}

impl Classified {
    /// Union of all group member sets
    pub fn members(&self) -> HashSet<EntityId> {
        self.groups.values().flatten().cloned().collect()
    }

    /// Everything a coordinator watches: plain entities, group entities,
    /// and the resolved group members
    pub fn watch_set(&self) -> HashSet<EntityId> {
        let mut set = self.plain.clone();
        set.extend(self.groups.keys().cloned());
        set.extend(self.members());
        set
    }

    /// Whether nothing was resolved
    pub fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.groups.is_empty()
    }
}

/// Classify `entity_ids` into plain entities and groups with members
///
/// Entities the host does not know are logged and skipped; they contribute
/// to neither output.
pub async fn classify(host: &dyn HostApi, entity_ids: &[EntityId]) -> Classified {
    let mut classified = Classified::default();

    for entity_id in entity_ids {
        let Some(state) = host.get_state(entity_id).await else {
            warn!(entity_id = %entity_id, "Entity not found, excluding from classification");
            continue;
        };

        match state.group_members() {
            Some(members) => {
                classified.groups.insert(entity_id.clone(), members);
            }
            None => {
                classified.plain.insert(entity_id.clone());
            }
        }
    }

    classified
}
