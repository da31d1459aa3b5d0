//! Coordinator manager
//!
//! Owns every live coordinator, keyed by relationship name, and mediates
//! their whole lifecycle: setup with conflict checking, teardown, routing of
//! state-change notifications, and the resubscribe cycle a group membership
//! change triggers. All methods take `&mut self`; the embedding host drives
//! them from a single dispatch context.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lightlink_core::{
    EntityId, RelationshipDefinition, RelationshipKind, RelationshipPayload, StateChange,
    UnknownKindError,
};
use lightlink_host::HostApi;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::conflict::find_conflict;
use crate::coordinator::{Coordinator, HandleOutcome, SetupError};
use crate::lifecycle::CoordinatorState;

/// Errors surfaced at the manager boundary
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The host handed over a relationship kind this engine does not know
    #[error("unknown relationship kind '{0}'")]
    UnknownKind(String),

    /// The payload did not match the schema of its kind
    #[error("invalid payload for kind '{kind}': {source}")]
    InvalidPayload {
        kind: RelationshipKind,
        #[source]
        source: serde_json::Error,
    },

    /// Setup was unsatisfiable; the coordinator is registered as failed
    #[error(transparent)]
    Setup(#[from] SetupError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl From<UnknownKindError> for ManagerError {
    fn from(err: UnknownKindError) -> Self {
        ManagerError::UnknownKind(err.0)
    }
}

/// Registry and lifecycle authority for all coordinators
pub struct CoordinatorManager {
    host: Arc<dyn HostApi>,
    coordinators: HashMap<String, Coordinator>,
}

impl CoordinatorManager {
    /// Create a manager bound to a host
    pub fn new(host: Arc<dyn HostApi>) -> Self {
        Self {
            host,
            coordinators: HashMap::new(),
        }
    }

    /// Set up a relationship from the host's untyped representation
    ///
    /// The kind is validated before any coordinator exists; an unknown kind
    /// or a payload that does not match its schema leaves the registry
    /// untouched.
    pub async fn setup_relationship(
        &mut self,
        name: impl Into<String>,
        kind: &str,
        payload: serde_json::Value,
    ) -> ManagerResult<()> {
        let kind: RelationshipKind = kind.parse()?;
        let payload = RelationshipPayload::from_parts(kind, payload)
            .map_err(|source| ManagerError::InvalidPayload { kind, source })?;
        self.setup(RelationshipDefinition::new(name, payload)).await
    }

    /// Set up a relationship from a typed definition
    ///
    /// An existing relationship under the same name is torn down first, so
    /// setup doubles as reconfiguration. On an unsatisfiable setup the
    /// coordinator stays registered in its failed state and the error is
    /// returned.
    pub async fn setup(&mut self, definition: RelationshipDefinition) -> ManagerResult<()> {
        let name = definition.name.clone();
        if let Some(mut existing) = self.coordinators.remove(&name) {
            debug!(relationship = %name, "Replacing existing relationship");
            existing.unload().await;
        }

        let mut coordinator = Coordinator::new(Arc::clone(&self.host), definition);
        let result = self.bring_up(&mut coordinator).await;
        self.coordinators.insert(name.clone(), coordinator);

        match result {
            Ok(()) => {
                info!(relationship = %name, "Relationship set up");
                Ok(())
            }
            Err(err) => {
                error!(relationship = %name, error = %err, "Relationship setup failed");
                Err(err.into())
            }
        }
    }

    /// Resolve, conflict-check, and subscribe one coordinator
    ///
    /// The conflict check runs for light sync only, against the watched sets
    /// of the other listening coordinators of the same kind. The requester
    /// is never in the registry while this runs, so it cannot conflict with
    /// itself.
    async fn bring_up(&self, coordinator: &mut Coordinator) -> Result<(), SetupError> {
        if let Err(err) = coordinator.resolve().await {
            coordinator.mark_setup_failed();
            return Err(err);
        }

        if coordinator.kind() == RelationshipKind::LightSync {
            let candidates = coordinator.watched_entities();
            let live = self
                .coordinators
                .values()
                .filter(|c| c.state() == CoordinatorState::Listening)
                .filter(|c| c.kind() == RelationshipKind::LightSync)
                .map(|c| (c.name(), c.watched_entities()))
                .collect::<Vec<_>>();
            let live_refs = live.iter().map(|(name, watched)| (*name, watched));
            if let Some(conflict) = find_conflict(live_refs, &candidates) {
                coordinator.mark_setup_failed();
                return Err(conflict.into());
            }
        }

        coordinator.start_listening().await;
        Ok(())
    }

    /// Tear down a relationship; no-op when the name is unknown
    pub async fn teardown_relationship(&mut self, name: &str) {
        match self.coordinators.remove(name) {
            Some(mut coordinator) => {
                coordinator.unload().await;
                info!(relationship = %name, "Relationship torn down");
            }
            None => {
                debug!(relationship = %name, "Teardown of unknown relationship, ignoring");
            }
        }
    }

    /// Point-in-time snapshot of what a relationship watches
    pub fn watched_entities(&self, name: &str) -> Option<HashSet<EntityId>> {
        self.coordinators.get(name).map(|c| c.watched_entities())
    }

    /// Lifecycle state of a relationship's coordinator
    pub fn relationship_state(&self, name: &str) -> Option<CoordinatorState> {
        self.coordinators.get(name).map(|c| c.state())
    }

    /// Names of all registered relationships
    pub fn relationship_names(&self) -> Vec<&str> {
        self.coordinators.keys().map(String::as_str).collect()
    }

    /// Number of registered relationships, failed ones included
    pub fn len(&self) -> usize {
        self.coordinators.len()
    }

    /// Whether no relationship is registered
    pub fn is_empty(&self) -> bool {
        self.coordinators.is_empty()
    }

    /// Deliver a state-change notification to every listening coordinator
    /// watching the changed entity
    ///
    /// Each recipient's handler runs to completion before the next one is
    /// invoked. Nothing here fails; coordinator-level problems are logged
    /// and absorbed.
    pub async fn dispatch(&mut self, event: &StateChange) {
        let recipients: Vec<String> = self
            .coordinators
            .values()
            .filter(|c| c.state() == CoordinatorState::Listening)
            .filter(|c| c.is_watching(&event.entity_id))
            .map(|c| c.name().to_string())
            .collect();

        for name in recipients {
            let Some(coordinator) = self.coordinators.get_mut(&name) else {
                continue;
            };
            let outcome = coordinator.handle_event(event).await;
            if outcome == HandleOutcome::MembershipChanged {
                self.refresh_subscription(&name).await;
            }
        }
    }

    /// Rebuild one coordinator's watch set after a membership change
    ///
    /// The coordinator is taken out of the registry, unloaded, and brought
    /// up again, so the conflict check runs against the others exactly as on
    /// first setup.
    async fn refresh_subscription(&mut self, name: &str) {
        let Some(mut coordinator) = self.coordinators.remove(name) else {
            return;
        };
        coordinator.unload().await;

        if let Err(err) = self.bring_up(&mut coordinator).await {
            warn!(relationship = %name, error = %err, "Resubscribe after membership change failed");
        } else {
            debug!(relationship = %name, "Resubscribed after membership change");
        }
        self.coordinators.insert(name.to_string(), coordinator);
    }
}
