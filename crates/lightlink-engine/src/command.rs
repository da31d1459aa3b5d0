//! Service call construction for light and switch commands
//!
//! Command failures are logged and swallowed: one unreachable target must
//! not abort the rest of a propagation pass.

use std::collections::HashMap;

use lightlink_core::{domains, EntityId, SYNCED_LIGHT_ATTRIBUTES, STATE_OFF, STATE_ON};
use lightlink_host::HostApi;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

/// Map a desired on/off value to the service that produces it
pub(crate) fn service_for_state(desired: &str) -> Option<&'static str> {
    match desired {
        STATE_ON => Some("turn_on"),
        STATE_OFF => Some("turn_off"),
        _ => None,
    }
}

/// Attributes forwarded alongside a light command
///
/// Turning off carries no attributes. Turning on carries only the synced
/// subset that is present and non-null on the source.
pub(crate) fn filtered_light_attributes(
    desired: &str,
    attributes: &HashMap<String, Value>,
) -> Map<String, Value> {
    let mut filtered = Map::new();
    if desired != STATE_ON {
        return filtered;
    }
    for key in SYNCED_LIGHT_ATTRIBUTES {
        if let Some(value) = attributes.get(*key) {
            if !value.is_null() {
                filtered.insert((*key).to_string(), value.clone());
            }
        }
    }
    filtered
}

/// Drive a light entity to the given on/off value, copying synced attributes
pub(crate) async fn set_light_state(
    host: &dyn HostApi,
    entity_id: &EntityId,
    desired: &str,
    attributes: &HashMap<String, Value>,
) {
    if !entity_id.is_domain(domains::LIGHT) {
        error!(entity_id = %entity_id, "Refusing to send light command to non-light entity");
        return;
    }
    let Some(service) = service_for_state(desired) else {
        error!(entity_id = %entity_id, desired, "Unsupported target state for light command");
        return;
    };

    let mut data = filtered_light_attributes(desired, attributes);
    data.insert("entity_id".to_string(), json!(entity_id));

    debug!(entity_id = %entity_id, service, "Issuing light command");
    if let Err(err) = host
        .call_service(domains::LIGHT, service, Value::Object(data))
        .await
    {
        error!(entity_id = %entity_id, service, error = %err, "Light command failed");
    }
}

/// Drive a switch entity to the given on/off value
pub(crate) async fn set_switch_state(host: &dyn HostApi, entity_id: &EntityId, desired: &str) {
    if !entity_id.is_domain(domains::SWITCH) {
        error!(entity_id = %entity_id, "Refusing to send switch command to non-switch entity");
        return;
    }
    let Some(service) = service_for_state(desired) else {
        error!(entity_id = %entity_id, desired, "Unsupported target state for switch command");
        return;
    };

    debug!(entity_id = %entity_id, service, "Issuing switch command");
    if let Err(err) = host
        .call_service(domains::SWITCH, service, json!({ "entity_id": entity_id }))
        .await
    {
        error!(entity_id = %entity_id, service, error = %err, "Switch command failed");
    }
}
