//! Relationship model
//!
//! A relationship is a user-declared rule linking a set of entities: mirrored
//! light groups, switch-to-light bindings, and event-to-light toggles. The
//! definition is immutable once created; the configuration layer validates it
//! before it reaches the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::EntityId;

/// Error returned when parsing an unrecognized relationship kind
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown relationship kind: {0}")]
pub struct UnknownKindError(pub String);

/// The kind of relationship a coordinator enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Mirrored light group: every configured light follows any other
    LightSync,
    /// Switch-to-light binding, wired or wireless
    SwitchBind,
    /// Event-to-light toggle binding
    EventBind,
}

impl RelationshipKind {
    /// The canonical string form, as used in configuration payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::LightSync => "light_sync",
            RelationshipKind::SwitchBind => "switch_bind",
            RelationshipKind::EventBind => "event_bind",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light_sync" => Ok(RelationshipKind::LightSync),
            "switch_bind" => Ok(RelationshipKind::SwitchBind),
            "event_bind" => Ok(RelationshipKind::EventBind),
            other => Err(UnknownKindError(other.to_string())),
        }
    }
}

/// Kind-specific entity lists for one relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipPayload {
    /// Lights (plain or group entities) that mirror each other
    LightSync {
        light_entity_ids: Vec<EntityId>,
    },

    /// Switches bound to lights; wireless switches are observed through
    /// their momentary event sub-entities instead of persistent state
    SwitchBind {
        switch_entity_ids: Vec<EntityId>,
        light_entity_ids: Vec<EntityId>,
        #[serde(default)]
        wireless: bool,
    },

    /// Event entities whose firings toggle the bound lights
    EventBind {
        event_entity_ids: Vec<EntityId>,
        light_entity_ids: Vec<EntityId>,
    },
}

impl RelationshipPayload {
    /// The kind this payload belongs to
    pub fn kind(&self) -> RelationshipKind {
        match self {
            RelationshipPayload::LightSync { .. } => RelationshipKind::LightSync,
            RelationshipPayload::SwitchBind { .. } => RelationshipKind::SwitchBind,
            RelationshipPayload::EventBind { .. } => RelationshipKind::EventBind,
        }
    }

    /// Deserialize a kind-tagged opaque payload, as handed over by the host
    pub fn from_parts(
        kind: RelationshipKind,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        let mut tagged = match payload {
            serde_json::Value::Object(map) => map,
            other => {
                return serde_json::from_value(other);
            }
        };
        tagged.insert("kind".to_string(), serde_json::Value::from(kind.as_str()));
        serde_json::from_value(serde_json::Value::Object(tagged))
    }
}

/// One validated relationship instance, immutable once created
///
/// `name` is the relationship's unique identity among live relationships;
/// the manager enforces uniqueness, not the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDefinition {
    /// Unique human identity, also the concurrency/conflict key
    pub name: String,

    /// Kind-specific entity lists
    #[serde(flatten)]
    pub payload: RelationshipPayload,
}

impl RelationshipDefinition {
    /// Create a definition
    pub fn new(name: impl Into<String>, payload: RelationshipPayload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// The relationship kind
    pub fn kind(&self) -> RelationshipKind {
        self.payload.kind()
    }
}
