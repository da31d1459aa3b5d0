//! Per-relationship coordinator
//!
//! One coordinator enforces one declared relationship. It resolves which
//! entities to observe, subscribes through the host, reacts to state-change
//! notifications with kind-specific propagation, and suppresses the echoes
//! its own commands produce. Lifecycle transitions follow
//! [`CoordinatorState::can_transition_to`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lightlink_core::{
    EntityId, RelationshipDefinition, RelationshipKind, RelationshipPayload, State, StateChange,
    STATE_OFF, STATE_ON,
};
use lightlink_host::{HostApi, SubscriptionToken};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::classifier::classify;
use crate::command;
use crate::conflict::Conflict;
use crate::fanout::FanOutWindow;
use crate::lifecycle::CoordinatorState;
use crate::observation::ObservationSet;

/// Why a coordinator could not be brought up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// Nothing resolved to watch; every configured entity was absent or
    /// the configuration was empty
    #[error("relationship '{relationship}' resolves to an empty watch set")]
    EmptyWatchSet { relationship: String },

    /// Another live relationship of the same kind already watches some of
    /// the requested entities
    #[error("conflict with relationship '{relationship}' over entities {entity_ids:?}")]
    Conflict {
        relationship: String,
        entity_ids: Vec<EntityId>,
    },
}

impl From<Conflict> for SetupError {
    fn from(conflict: Conflict) -> Self {
        SetupError::Conflict {
            relationship: conflict.relationship,
            entity_ids: conflict.entity_ids,
        }
    }
}

/// What the manager must do after a notification was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandleOutcome {
    /// Nothing further; the coordinator keeps listening
    Handled,
    /// A tracked group's membership changed; the manager must tear the
    /// coordinator down and bring it up again to refresh the watch set
    MembershipChanged,
}

/// Enforces one relationship against the host
pub struct Coordinator {
    host: Arc<dyn HostApi>,
    definition: RelationshipDefinition,
    state: CoordinatorState,
    observation: ObservationSet,
    fanout: FanOutWindow,
    subscription: Option<SubscriptionToken>,
    /// Event sub-entities of wireless switches, resolved at subscribe time
    switch_events: HashSet<EntityId>,
}

impl Coordinator {
    /// Create an unconfigured coordinator for a relationship
    pub fn new(host: Arc<dyn HostApi>, definition: RelationshipDefinition) -> Self {
        Self {
            host,
            definition,
            state: CoordinatorState::Unconfigured,
            observation: ObservationSet::default(),
            fanout: FanOutWindow::new(),
            subscription: None,
            switch_events: HashSet::new(),
        }
    }

    /// The relationship's unique name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The relationship kind
    pub fn kind(&self) -> RelationshipKind {
        self.definition.kind()
    }

    /// Current lifecycle state
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Point-in-time snapshot of the watched entity set
    pub fn watched_entities(&self) -> HashSet<EntityId> {
        self.observation.watched().clone()
    }

    pub(crate) fn is_watching(&self, entity_id: &EntityId) -> bool {
        self.observation.is_watched(entity_id)
    }

    fn transition(&mut self, to: CoordinatorState) {
        if !self.state.can_transition_to(to) {
            warn!(
                relationship = %self.definition.name,
                from = ?self.state,
                to = ?to,
                "Unexpected coordinator state transition"
            );
        }
        self.state = to;
    }

    /// Resolve the observation set for this relationship
    ///
    /// Enters `Subscribing`; fails with [`SetupError::EmptyWatchSet`] when
    /// nothing resolves. No subscription is performed here.
    pub(crate) async fn resolve(&mut self) -> Result<(), SetupError> {
        self.transition(CoordinatorState::Subscribing);
        self.switch_events.clear();

        self.observation = match &self.definition.payload {
            RelationshipPayload::LightSync { light_entity_ids } => {
                let classified = classify(self.host.as_ref(), light_entity_ids).await;
                ObservationSet::new(classified.watch_set(), classified.groups)
            }
            RelationshipPayload::SwitchBind {
                switch_entity_ids,
                light_entity_ids,
                wireless,
            } => {
                let mut watched: HashSet<EntityId> = light_entity_ids.iter().cloned().collect();
                if *wireless {
                    // stateless switches are observed through their event
                    // sub-entities, never through on/off state
                    for switch_id in switch_entity_ids {
                        let events = self.host.switch_event_entities(switch_id).await;
                        if events.is_empty() {
                            warn!(
                                entity_id = %switch_id,
                                "Wireless switch has no event sub-entities"
                            );
                        }
                        self.switch_events.extend(events);
                    }
                    watched.extend(self.switch_events.iter().cloned());
                } else {
                    watched.extend(switch_entity_ids.iter().cloned());
                }
                ObservationSet::new(watched, Default::default())
            }
            RelationshipPayload::EventBind {
                event_entity_ids, ..
            } => ObservationSet::new(event_entity_ids.iter().cloned().collect(), Default::default()),
        };

        if self.observation.is_empty() {
            return Err(SetupError::EmptyWatchSet {
                relationship: self.definition.name.clone(),
            });
        }
        Ok(())
    }

    /// Subscribe the resolved watch set and enter `Listening`
    pub(crate) async fn start_listening(&mut self) {
        let token = self.host.subscribe(self.observation.watched().clone()).await;
        self.subscription = Some(token);
        self.transition(CoordinatorState::Listening);
        info!(
            relationship = %self.definition.name,
            kind = %self.kind(),
            entities = self.observation.watched().len(),
            "Coordinator listening"
        );
    }

    /// Record that setup was unsatisfiable
    pub(crate) fn mark_setup_failed(&mut self) {
        self.transition(CoordinatorState::SetupFailed);
    }

    /// Release the subscription and drop all derived state; idempotent
    pub(crate) async fn unload(&mut self) {
        if let Some(token) = self.subscription.take() {
            self.host.unsubscribe(token).await;
        }
        self.observation.clear();
        self.switch_events.clear();
        self.fanout.reset();
        self.transition(CoordinatorState::Unloaded);
    }

    /// Process one state-change notification, run to completion
    pub(crate) async fn handle_event(&mut self, event: &StateChange) -> HandleOutcome {
        let (Some(old_state), Some(new_state)) = (&event.old_state, &event.new_state) else {
            debug!(entity_id = %event.entity_id, "Notification without both states, dropping");
            return HandleOutcome::Handled;
        };

        // a tracked group coming back from unavailable means its membership
        // changed; the watch set must be rebuilt before anything propagates
        if self.observation.is_group(&event.entity_id) && old_state.is_unavailable() {
            debug!(
                relationship = %self.definition.name,
                entity_id = %event.entity_id,
                "Group membership changed, requesting resubscribe"
            );
            return HandleOutcome::MembershipChanged;
        }

        if self.kind() == RelationshipKind::LightSync && !new_state.is_on() && !new_state.is_off()
        {
            debug!(
                entity_id = %event.entity_id,
                state = %new_state.state,
                "Not an on/off transition, dropping"
            );
            return HandleOutcome::Handled;
        }

        self.fanout.refresh(event.time_fired);
        if self.fanout.is_suppressed(&event.entity_id) {
            debug!(
                relationship = %self.definition.name,
                entity_id = %event.entity_id,
                "Dropping self-caused echo"
            );
            return HandleOutcome::Handled;
        }

        match &self.definition.payload {
            RelationshipPayload::LightSync { .. } => {
                self.propagate_light_sync(&event.entity_id, new_state, event.time_fired)
                    .await;
            }
            RelationshipPayload::SwitchBind { .. } => {
                self.propagate_switch_bind(&event.entity_id, new_state, event.time_fired)
                    .await;
            }
            RelationshipPayload::EventBind {
                light_entity_ids, ..
            } => {
                let lights = light_entity_ids.clone();
                self.toggle_lights(&lights, event.time_fired).await;
            }
        }
        HandleOutcome::Handled
    }

    /// Mirror an on/off change across the other synced lights
    ///
    /// Targets are the configured plain and group entities, never resolved
    /// group members; the host fans a group command out itself. Groups the
    /// source belongs to are excluded so same-group siblings receive no
    /// redundant update.
    async fn propagate_light_sync(
        &mut self,
        source: &EntityId,
        new_state: &State,
        at: DateTime<Utc>,
    ) {
        let RelationshipPayload::LightSync { light_entity_ids } = &self.definition.payload else {
            return;
        };

        let source_groups: HashSet<EntityId> = self
            .observation
            .groups_containing(source)
            .cloned()
            .collect();

        let mut targets: Vec<EntityId> = light_entity_ids
            .iter()
            .filter(|id| *id != source)
            .filter(|id| !source_groups.contains(id))
            .filter(|id| self.observation.is_watched(id))
            .cloned()
            .collect();
        targets.sort();
        targets.dedup();

        // everything else this coordinator watches will echo the commands
        let suppress: Vec<EntityId> = self
            .observation
            .watched()
            .iter()
            .filter(|id| *id != source)
            .cloned()
            .collect();
        self.fanout.suppress(suppress);

        let host = Arc::clone(&self.host);
        for target in &targets {
            command::set_light_state(host.as_ref(), target, &new_state.state, &new_state.attributes)
                .await;
        }
        self.fanout.mark_processed(at);
    }

    /// Forward an on/off change between bound switches and lights
    async fn propagate_switch_bind(
        &mut self,
        source: &EntityId,
        new_state: &State,
        at: DateTime<Utc>,
    ) {
        let RelationshipPayload::SwitchBind {
            switch_entity_ids,
            light_entity_ids,
            wireless,
        } = &self.definition.payload
        else {
            return;
        };

        let host = Arc::clone(&self.host);

        if switch_entity_ids.contains(source) {
            if *wireless {
                debug!(entity_id = %source, "Wireless switch state change, ignoring");
                return;
            }
            if !new_state.is_on() && !new_state.is_off() {
                debug!(entity_id = %source, state = %new_state.state, "Not an on/off value, dropping");
                return;
            }
            let lights = light_entity_ids.clone();
            self.fanout.suppress(lights.iter().cloned());
            for light_id in &lights {
                command::set_light_state(
                    host.as_ref(),
                    light_id,
                    &new_state.state,
                    &new_state.attributes,
                )
                .await;
            }
            self.fanout.mark_processed(at);
        } else if light_entity_ids.contains(source) {
            if *wireless {
                debug!(entity_id = %source, "Light change under wireless binding, ignoring");
                return;
            }
            if !new_state.is_on() && !new_state.is_off() {
                debug!(entity_id = %source, state = %new_state.state, "Not an on/off value, dropping");
                return;
            }
            let switches = switch_entity_ids.clone();
            self.fanout.suppress(switches.iter().cloned());
            for switch_id in &switches {
                command::set_switch_state(host.as_ref(), switch_id, &new_state.state).await;
            }
            self.fanout.mark_processed(at);
        } else if self.switch_events.contains(source) {
            let lights = light_entity_ids.clone();
            self.toggle_lights(&lights, at).await;
        } else {
            error!(
                relationship = %self.definition.name,
                entity_id = %source,
                "Notification from an entity this binding does not know"
            );
        }
    }

    /// Toggle each bound light against its live state, independently
    ///
    /// Each light is re-queried immediately before its command; a light that
    /// is on goes off, anything else goes on. Lights the host does not know
    /// are logged and skipped.
    async fn toggle_lights(&mut self, light_entity_ids: &[EntityId], at: DateTime<Utc>) {
        self.fanout.suppress(light_entity_ids.iter().cloned());

        let host = Arc::clone(&self.host);
        for light_id in light_entity_ids {
            let Some(light_state) = host.get_state(light_id).await else {
                error!(entity_id = %light_id, "Light not found, skipping toggle");
                continue;
            };
            let desired = if light_state.is_on() { STATE_OFF } else { STATE_ON };
            command::set_light_state(host.as_ref(), light_id, desired, &Default::default()).await;
        }
        self.fanout.mark_processed(at);
    }
}
