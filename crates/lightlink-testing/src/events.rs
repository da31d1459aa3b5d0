//! Builders for states and state-change notifications
//!
//! Tests drive the engine with hand-crafted notifications carrying explicit
//! timestamps, so quiescence-window behavior is deterministic.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lightlink_core::{State, StateChange};

/// Build a state without attributes
pub fn state(entity_id: &str, value: &str) -> State {
    State::new(entity_id.parse().expect("invalid entity_id"), value, HashMap::new())
}

/// Build a state with attributes
pub fn state_with(
    entity_id: &str,
    value: &str,
    attributes: HashMap<String, serde_json::Value>,
) -> State {
    State::new(entity_id.parse().expect("invalid entity_id"), value, attributes)
}

/// Build an attribute-less value transition notification
pub fn value_change(entity_id: &str, old: &str, new: &str, at: DateTime<Utc>) -> StateChange {
    StateChange::new(
        entity_id.parse().expect("invalid entity_id"),
        Some(state(entity_id, old)),
        Some(state(entity_id, new)),
        at,
    )
}

/// Build a value transition notification with attributes on the new state
pub fn value_change_with(
    entity_id: &str,
    old: &str,
    new: &str,
    attributes: HashMap<String, serde_json::Value>,
    at: DateTime<Utc>,
) -> StateChange {
    StateChange::new(
        entity_id.parse().expect("invalid entity_id"),
        Some(state(entity_id, old)),
        Some(state_with(entity_id, new, attributes)),
        at,
    )
}
