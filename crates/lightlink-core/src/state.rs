//! State type representing an entity's observed state

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntityId, ATTR_GROUP_MEMBERS, STATE_OFF, STATE_ON, STATE_UNAVAILABLE};

/// The state of an entity at a point in time, as reported by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// The entity this state belongs to
    pub entity_id: EntityId,

    /// The state value (e.g. "on", "off", "unavailable")
    pub state: String,

    /// Attributes associated with the state
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// When the state last changed
    pub last_changed: DateTime<Utc>,
}

impl State {
    /// Create a new state with the current timestamp
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            entity_id,
            state: state.into(),
            attributes,
            last_changed: Utc::now(),
        }
    }

    /// Check if the state value is "on"
    pub fn is_on(&self) -> bool {
        self.state == STATE_ON
    }

    /// Check if the state value is "off"
    pub fn is_off(&self) -> bool {
        self.state == STATE_OFF
    }

    /// Check if the entity is unavailable
    pub fn is_unavailable(&self) -> bool {
        self.state == STATE_UNAVAILABLE
    }

    /// Get an attribute value by key
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Resolved member entity ids when this state belongs to a group entity
    ///
    /// A group entity exposes its membership through the [`ATTR_GROUP_MEMBERS`]
    /// attribute. Returns `None` for non-group entities; unparsable member ids
    /// are skipped. This is the single place the attribute shape is known, so
    /// callers stay insulated from how the host encodes group membership.
    pub fn group_members(&self) -> Option<HashSet<EntityId>> {
        let members = self.attributes.get(ATTR_GROUP_MEMBERS)?.as_array()?;
        Some(
            members
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| s.parse().ok())
                .collect(),
        )
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        // Timestamps are not compared
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}
