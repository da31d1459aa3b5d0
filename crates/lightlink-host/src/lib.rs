//! Host boundary for lightlink
//!
//! The engine runs embedded in a home-automation host that owns the entity
//! registry, state storage, and service-call transport. This crate defines
//! the narrow contract the engine consumes: state lookup, state-change
//! subscriptions, and the command transport. The host (or a test double)
//! implements [`HostApi`]; the engine never talks to devices directly.

use std::collections::HashSet;

use async_trait::async_trait;
use lightlink_core::{EntityId, State};
use thiserror::Error;

/// Errors surfaced by host operations
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("service not found: {domain}.{service}")]
    ServiceNotFound { domain: String, service: String },

    #[error("service call failed: {0}")]
    CallFailed(String),
}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Handle for an active state-change subscription
///
/// Returned by [`HostApi::subscribe`]; passing it back to
/// [`HostApi::unsubscribe`] releases the subscription. The token is opaque
/// to the engine beyond being a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    /// Construct a token from a host-assigned raw id
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The host-assigned raw id
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// The operations the embedding host provides to the engine
///
/// All calls are cooperative yield points; the host serializes notification
/// delivery per subscriber, so implementations need no internal ordering
/// guarantees beyond answering these queries.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Look up the current state of an entity, or `None` if it is absent
    async fn get_state(&self, entity_id: &EntityId) -> Option<State>;

    /// Register interest in state changes for a set of entities
    async fn subscribe(&self, entity_ids: HashSet<EntityId>) -> SubscriptionToken;

    /// Release a subscription; safe to call with an already-released token
    async fn unsubscribe(&self, token: SubscriptionToken);

    /// Invoke a host service (e.g. `light.turn_on`) with the given data
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> HostResult<()>;

    /// Resolve the momentary event sub-entities of a wireless switch
    ///
    /// Backed by the host's device registry: a stateless wireless switch is
    /// observed through the event entities on the same device rather than
    /// through persistent on/off state. Returns an empty list for switches
    /// without event sub-entities.
    async fn switch_event_entities(&self, switch_entity_id: &EntityId) -> Vec<EntityId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_raw_roundtrip() {
        let token = SubscriptionToken::from_raw(7);
        assert_eq!(token.as_raw(), 7);
        assert_eq!(token, SubscriptionToken::from_raw(7));
        assert_ne!(token, SubscriptionToken::from_raw(8));
    }

    #[test]
    fn test_host_error_display() {
        let err = HostError::ServiceNotFound {
            domain: "light".to_string(),
            service: "turn_on".to_string(),
        };
        assert_eq!(err.to_string(), "service not found: light.turn_on");
    }
}
