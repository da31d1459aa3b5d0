//! Cross-relationship conflict checker
//!
//! Relationship kinds with non-overlapping watch sets (light sync) must not
//! observe an entity another live relationship of the same kind already
//! watches. The manager feeds this check a point-in-time snapshot of the
//! other coordinators' watched sets; the first overlap found wins.

use std::collections::HashSet;

use lightlink_core::EntityId;

/// A detected watch-set overlap with another live relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Name of the relationship already watching the entities
    pub relationship: String,
    /// The overlapping entity ids, sorted for stable reporting
    pub entity_ids: Vec<EntityId>,
}

/// Find the first live relationship whose watched set overlaps `candidates`
///
/// `live` yields `(name, watched_set)` pairs for the other coordinators of
/// the same kind; the caller excludes the requester itself.
pub(crate) fn find_conflict<'a, I>(live: I, candidates: &HashSet<EntityId>) -> Option<Conflict>
where
    I: IntoIterator<Item = (&'a str, &'a HashSet<EntityId>)>,
{
    for (name, watched) in live {
        let mut overlap: Vec<EntityId> = candidates.intersection(watched).cloned().collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Some(Conflict {
                relationship: name.to_string(),
                entity_ids: overlap,
            });
        }
    }
    None
}
