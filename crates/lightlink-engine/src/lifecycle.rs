//! Coordinator lifecycle states
//!
//! ```text
//! Unconfigured → Subscribing → Listening → Unloaded
//!                           ↘ SetupFailed → Unloaded
//! Unloaded → Subscribing   (brought up again after a membership change)
//! ```

/// Lifecycle state of one coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Constructed, no observation resolved yet
    Unconfigured,
    /// Resolving the observation set and subscribing
    Subscribing,
    /// Subscribed and processing notifications
    Listening,
    /// Setup was unsatisfiable (empty watch set or conflict); stays
    /// registered until reconfigured or torn down
    SetupFailed,
    /// Torn down; all subscriptions released
    Unloaded,
}

impl CoordinatorState {
    /// Whether a transition to `to` is valid
    pub fn can_transition_to(self, to: CoordinatorState) -> bool {
        use CoordinatorState::*;

        match (self, to) {
            (Unconfigured, Subscribing) => true,
            (Subscribing, Listening) => true,
            (Subscribing, SetupFailed) => true,
            // a membership change unloads and re-enters the setup path
            (Unloaded, Subscribing) => true,
            // teardown is valid from every state, and idempotent
            (_, Unloaded) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CoordinatorState::*;

    #[test]
    fn test_setup_path() {
        assert!(Unconfigured.can_transition_to(Subscribing));
        assert!(Subscribing.can_transition_to(Listening));
        assert!(Subscribing.can_transition_to(SetupFailed));
    }

    #[test]
    fn test_resubscribe_cycle_is_valid() {
        // the membership-refresh path steps through every one of these
        let cycle = [Listening, Unloaded, Subscribing, Listening];
        for pair in cycle.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{:?} -> {:?} must be valid",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_teardown_from_anywhere() {
        for state in [Unconfigured, Subscribing, Listening, SetupFailed, Unloaded] {
            assert!(state.can_transition_to(Unloaded));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Unconfigured.can_transition_to(Listening));
        assert!(!Unconfigured.can_transition_to(SetupFailed));
        assert!(!Listening.can_transition_to(SetupFailed));
        assert!(!Listening.can_transition_to(Subscribing));
        assert!(!SetupFailed.can_transition_to(Listening));
        assert!(!Unloaded.can_transition_to(Listening));
    }
}
