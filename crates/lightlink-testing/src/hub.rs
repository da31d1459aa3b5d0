//! In-memory host implementation with captured service calls

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use lightlink_core::{domains, EntityId, State, STATE_OFF, STATE_ON};
use lightlink_host::{HostApi, HostError, HostResult, SubscriptionToken};

/// A service call captured by [`TestHub`] for assertions
#[derive(Debug, Clone)]
pub struct RecordedServiceCall {
    /// Service domain, e.g. "light"
    pub domain: String,
    /// Service name, e.g. "turn_on"
    pub service: String,
    /// Service data as handed to the host
    pub data: serde_json::Value,
}

impl RecordedServiceCall {
    /// The target entity id from the service data, if any
    pub fn entity_id(&self) -> Option<String> {
        self.data
            .get("entity_id")
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// The full service identifier (domain.service)
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// The attribute keys carried besides `entity_id`
    pub fn attribute_keys(&self) -> HashSet<String> {
        self.data
            .as_object()
            .map(|map| {
                map.keys()
                    .filter(|k| k.as_str() != "entity_id")
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// An isolated in-memory host for driving the engine in tests
///
/// States are scriptable via [`TestHub::put_state`]; every service call is
/// recorded, and `light`/`switch` `turn_on`/`turn_off` calls are applied to
/// the state map the way the real host would. Applying a call does NOT
/// synthesize a state-change notification; tests feed echo notifications
/// explicitly, which keeps fan-out suppression behavior observable.
#[derive(Default)]
pub struct TestHub {
    states: DashMap<EntityId, State>,
    calls: Mutex<Vec<RecordedServiceCall>>,
    subscriptions: DashMap<u64, HashSet<EntityId>>,
    switch_events: DashMap<EntityId, Vec<EntityId>>,
    failing_entities: DashMap<EntityId, ()>,
    next_token: AtomicU64,
}

impl TestHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an entity state, creating or replacing it
    pub fn put_state(
        &self,
        entity_id: &str,
        value: &str,
        attributes: HashMap<String, serde_json::Value>,
    ) {
        let entity_id: EntityId = entity_id.parse().expect("invalid entity_id");
        self.states
            .insert(entity_id.clone(), State::new(entity_id, value, attributes));
    }

    /// Remove an entity entirely
    pub fn remove_state(&self, entity_id: &str) {
        let entity_id: EntityId = entity_id.parse().expect("invalid entity_id");
        self.states.remove(&entity_id);
    }

    /// Current state value of an entity
    pub fn state_value(&self, entity_id: &str) -> Option<String> {
        let entity_id: EntityId = entity_id.parse().expect("invalid entity_id");
        self.states.get(&entity_id).map(|s| s.state.clone())
    }

    /// Declare the event sub-entities of a wireless switch
    pub fn put_switch_events(&self, switch_entity_id: &str, event_entity_ids: &[&str]) {
        let switch: EntityId = switch_entity_id.parse().expect("invalid entity_id");
        let events = event_entity_ids
            .iter()
            .map(|id| id.parse().expect("invalid entity_id"))
            .collect();
        self.switch_events.insert(switch, events);
    }

    /// Make every future service call targeting this entity fail
    pub fn fail_calls_for(&self, entity_id: &str) {
        let entity_id: EntityId = entity_id.parse().expect("invalid entity_id");
        self.failing_entities.insert(entity_id, ());
    }

    /// All captured service calls, in issue order
    pub fn service_calls(&self) -> Vec<RecordedServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Captured service calls for one domain
    pub fn calls_for(&self, domain: &str) -> Vec<RecordedServiceCall> {
        self.service_calls()
            .into_iter()
            .filter(|c| c.domain == domain)
            .collect()
    }

    /// Drop all captured service calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Union of entity ids across all live subscriptions
    pub fn subscribed_entities(&self) -> HashSet<EntityId> {
        self.subscriptions
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    fn apply_call(&self, domain: &str, service: &str, data: &serde_json::Value) {
        if domain != domains::LIGHT && domain != domains::SWITCH {
            return;
        }
        let value = match service {
            "turn_on" => STATE_ON,
            "turn_off" => STATE_OFF,
            _ => return,
        };
        let Some(entity_id) = data.get("entity_id").and_then(|v| v.as_str()) else {
            return;
        };
        let Ok(entity_id) = entity_id.parse::<EntityId>() else {
            return;
        };
        let attributes = data
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(k, _)| k.as_str() != "entity_id")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        self.states
            .insert(entity_id.clone(), State::new(entity_id, value, attributes));
    }
}

#[async_trait]
impl HostApi for TestHub {
    async fn get_state(&self, entity_id: &EntityId) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    async fn subscribe(&self, entity_ids: HashSet<EntityId>) -> SubscriptionToken {
        let raw = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.insert(raw, entity_ids);
        SubscriptionToken::from_raw(raw)
    }

    async fn unsubscribe(&self, token: SubscriptionToken) {
        self.subscriptions.remove(&token.as_raw());
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> HostResult<()> {
        self.calls.lock().unwrap().push(RecordedServiceCall {
            domain: domain.to_string(),
            service: service.to_string(),
            data: data.clone(),
        });

        if let Some(entity_id) = data.get("entity_id").and_then(|v| v.as_str()) {
            if let Ok(entity_id) = entity_id.parse::<EntityId>() {
                if self.failing_entities.contains_key(&entity_id) {
                    return Err(HostError::CallFailed(format!(
                        "device {entity_id} did not respond"
                    )));
                }
            }
        }

        self.apply_call(domain, service, &data);
        Ok(())
    }

    async fn switch_event_entities(&self, switch_entity_id: &EntityId) -> Vec<EntityId> {
        self.switch_events
            .get(switch_entity_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}
