//! Relationship lifecycle: setup, conflict checking, teardown, resubscribe

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use lightlink_core::{EntityId, RelationshipDefinition, RelationshipPayload, ATTR_GROUP_MEMBERS};
use lightlink_engine::{CoordinatorManager, CoordinatorState, ManagerError, SetupError};
use lightlink_testing::{events, TestHub};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;

/// Counts WARN and ERROR events emitted on the current thread
#[derive(Clone, Default)]
struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() <= tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn ids(raw: &[&str]) -> Vec<EntityId> {
    raw.iter().map(|s| s.parse().unwrap()).collect()
}

fn light_sync(name: &str, lights: &[&str]) -> RelationshipDefinition {
    RelationshipDefinition::new(
        name,
        RelationshipPayload::LightSync {
            light_entity_ids: ids(lights),
        },
    )
}

fn hub_with_lights(lights: &[&str]) -> Arc<TestHub> {
    let hub = Arc::new(TestHub::new());
    for light in lights {
        hub.put_state(light, "off", HashMap::new());
    }
    hub
}

#[tokio::test]
async fn test_setup_subscribes_and_listens() {
    let hub = hub_with_lights(&["light.a", "light.b"]);
    let mut manager = CoordinatorManager::new(hub.clone());

    manager
        .setup(light_sync("room", &["light.a", "light.b"]))
        .await
        .unwrap();

    assert_eq!(
        manager.relationship_state("room"),
        Some(CoordinatorState::Listening)
    );
    assert_eq!(hub.active_subscriptions(), 1);
    assert_eq!(
        manager.watched_entities("room").unwrap(),
        ids(&["light.a", "light.b"]).into_iter().collect()
    );
}

#[tokio::test]
async fn test_empty_watch_set_fails_setup() {
    // nothing in the hub, so every configured entity fails to resolve
    let hub = Arc::new(TestHub::new());
    let mut manager = CoordinatorManager::new(hub.clone());

    let err = manager
        .setup(light_sync("ghost", &["light.a", "light.b"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Setup(SetupError::EmptyWatchSet { .. })
    ));
    assert_eq!(
        manager.relationship_state("ghost"),
        Some(CoordinatorState::SetupFailed)
    );
    assert_eq!(hub.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_conflicting_light_sync_fails_and_names_owner() {
    let hub = hub_with_lights(&["light.a", "light.b", "light.c"]);
    let mut manager = CoordinatorManager::new(hub.clone());

    manager
        .setup(light_sync("upstairs", &["light.a", "light.b"]))
        .await
        .unwrap();

    let err = manager
        .setup(light_sync("clash", &["light.b", "light.c"]))
        .await
        .unwrap_err();

    match err {
        ManagerError::Setup(SetupError::Conflict {
            relationship,
            entity_ids,
        }) => {
            assert_eq!(relationship, "upstairs");
            assert_eq!(entity_ids, ids(&["light.b"]));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // the first relationship is untouched, the second stays registered failed
    assert_eq!(
        manager.relationship_state("upstairs"),
        Some(CoordinatorState::Listening)
    );
    assert_eq!(
        manager.relationship_state("clash"),
        Some(CoordinatorState::SetupFailed)
    );
    assert_eq!(hub.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_failed_relationship_does_not_block_others() {
    let hub = hub_with_lights(&["light.a", "light.b"]);
    let mut manager = CoordinatorManager::new(hub.clone());

    manager
        .setup(light_sync("upstairs", &["light.a"]))
        .await
        .unwrap();
    manager
        .setup(light_sync("clash", &["light.a", "light.b"]))
        .await
        .unwrap_err();

    // a failed coordinator is not listening, so its entities are free again
    manager
        .setup(light_sync("downstairs", &["light.b"]))
        .await
        .unwrap();
    assert_eq!(
        manager.relationship_state("downstairs"),
        Some(CoordinatorState::Listening)
    );
}

#[tokio::test]
async fn test_setup_replaces_existing_name() {
    let hub = hub_with_lights(&["light.a", "light.b", "light.c"]);
    let mut manager = CoordinatorManager::new(hub.clone());

    manager
        .setup(light_sync("room", &["light.a", "light.b"]))
        .await
        .unwrap();
    manager
        .setup(light_sync("room", &["light.a", "light.c"]))
        .await
        .unwrap();

    assert_eq!(manager.len(), 1);
    assert_eq!(hub.active_subscriptions(), 1);
    assert_eq!(
        manager.watched_entities("room").unwrap(),
        ids(&["light.a", "light.c"]).into_iter().collect()
    );
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let hub = hub_with_lights(&["light.a", "light.b"]);
    let mut manager = CoordinatorManager::new(hub.clone());

    manager
        .setup(light_sync("room", &["light.a", "light.b"]))
        .await
        .unwrap();
    assert_eq!(hub.active_subscriptions(), 1);

    manager.teardown_relationship("room").await;
    assert_eq!(hub.active_subscriptions(), 0);
    assert!(manager.is_empty());

    // tearing down again, and tearing down an unknown name, are no-ops
    manager.teardown_relationship("room").await;
    manager.teardown_relationship("never-existed").await;
}

#[tokio::test]
async fn test_setup_relationship_rejects_unknown_kind() {
    let hub = Arc::new(TestHub::new());
    let mut manager = CoordinatorManager::new(hub);

    let err = manager
        .setup_relationship("room", "color_sync", json!({"light_entity_ids": []}))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::UnknownKind(kind) if kind == "color_sync"));
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_setup_relationship_rejects_malformed_payload() {
    let hub = Arc::new(TestHub::new());
    let mut manager = CoordinatorManager::new(hub);

    let err = manager
        .setup_relationship("room", "light_sync", json!({"lights": ["light.a"]}))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::InvalidPayload { .. }));
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_setup_relationship_accepts_untyped_payload() {
    let hub = hub_with_lights(&["light.a", "light.b"]);
    let mut manager = CoordinatorManager::new(hub);

    manager
        .setup_relationship(
            "room",
            "light_sync",
            json!({"light_entity_ids": ["light.a", "light.b"]}),
        )
        .await
        .unwrap();

    assert_eq!(
        manager.relationship_state("room"),
        Some(CoordinatorState::Listening)
    );
}

#[tokio::test]
async fn test_group_membership_change_resubscribes() {
    let hub = Arc::new(TestHub::new());
    hub.put_state("light.solo", "off", HashMap::new());
    hub.put_state(
        "light.bedroom",
        "off",
        HashMap::from([(ATTR_GROUP_MEMBERS.to_string(), json!(["light.bed_left"]))]),
    );
    let mut manager = CoordinatorManager::new(hub.clone());

    manager
        .setup(light_sync("bedroom", &["light.solo", "light.bedroom"]))
        .await
        .unwrap();
    let watched = manager.watched_entities("bedroom").unwrap();
    assert!(watched.contains(&"light.bed_left".parse().unwrap()));
    assert!(!watched.contains(&"light.bed_right".parse().unwrap()));

    // the group gains a member; the host announces it with an
    // unavailable -> on transition of the group entity
    hub.put_state(
        "light.bedroom",
        "on",
        HashMap::from([(
            ATTR_GROUP_MEMBERS.to_string(),
            json!(["light.bed_left", "light.bed_right"]),
        )]),
    );
    manager
        .dispatch(&events::value_change(
            "light.bedroom",
            "unavailable",
            "on",
            Utc::now(),
        ))
        .await;

    // the watch set was rebuilt and nothing was propagated
    let watched = manager.watched_entities("bedroom").unwrap();
    assert!(watched.contains(&"light.bed_right".parse().unwrap()));
    assert_eq!(
        manager.relationship_state("bedroom"),
        Some(CoordinatorState::Listening)
    );
    assert!(hub.service_calls().is_empty());
    assert_eq!(hub.active_subscriptions(), 1);
}

#[tokio::test]
async fn test_membership_refresh_is_clean() {
    let counter = WarnCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let hub = Arc::new(TestHub::new());
    hub.put_state(
        "light.bedroom",
        "off",
        HashMap::from([(ATTR_GROUP_MEMBERS.to_string(), json!(["light.bed_left"]))]),
    );
    let mut manager = CoordinatorManager::new(hub.clone());
    manager
        .setup(light_sync("bedroom", &["light.bedroom"]))
        .await
        .unwrap();

    hub.put_state(
        "light.bedroom",
        "on",
        HashMap::from([(
            ATTR_GROUP_MEMBERS.to_string(),
            json!(["light.bed_left", "light.bed_right"]),
        )]),
    );
    manager
        .dispatch(&events::value_change(
            "light.bedroom",
            "unavailable",
            "on",
            Utc::now(),
        ))
        .await;

    // a routine refresh must not log any warning or error
    assert_eq!(counter.count(), 0);
    assert_eq!(
        manager.relationship_state("bedroom"),
        Some(CoordinatorState::Listening)
    );
}
