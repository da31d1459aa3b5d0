//! State-change notification payload delivered by the host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntityId, State};

/// A state-change notification for a single entity
///
/// Either side may be absent: `old_state` is `None` when the entity first
/// appears, `new_state` is `None` when it is removed. The engine only acts
/// on notifications carrying both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// The entity that changed
    pub entity_id: EntityId,

    /// State before the change, if any
    pub old_state: Option<State>,

    /// State after the change, if any
    pub new_state: Option<State>,

    /// When the host fired the notification
    pub time_fired: DateTime<Utc>,
}

impl StateChange {
    /// Create a notification with an explicit timestamp
    pub fn new(
        entity_id: EntityId,
        old_state: Option<State>,
        new_state: Option<State>,
        time_fired: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_id,
            old_state,
            new_state,
            time_fired,
        }
    }
}
