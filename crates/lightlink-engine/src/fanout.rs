//! Fan-out suppression window
//!
//! When a coordinator propagates a change, the commands it issues produce
//! their own state-change notifications. The coordinator pre-emptively
//! records the target ids here and drops notifications from them while the
//! window stays open, breaking the echo loop. The set is time-bounded: once the gap since the
//! last processed notification exceeds the quiescence window, every entry is
//! cleared, so a lost echo can never block propagation forever.
//!
//! This is a heuristic, not request correlation: a genuine external change
//! to a suppressed entity inside the window is also dropped.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use lightlink_core::EntityId;
use tracing::debug;

/// Gap after which stale suppression entries are discarded
pub const QUIESCENCE_WINDOW_SECS: i64 = 3;

/// Time-windowed set of entity ids whose next notification is self-caused
#[derive(Debug, Clone, Default)]
pub struct FanOutWindow {
    suppressed: HashSet<EntityId>,
    window_opened_at: Option<DateTime<Utc>>,
}

impl FanOutWindow {
    /// Create an empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear stale suppression entries before processing a notification
    ///
    /// Entries survive only while the gap since the last processed
    /// notification stays within the quiescence window.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        let stale = match self.window_opened_at {
            None => true,
            Some(opened) => now - opened > Duration::seconds(QUIESCENCE_WINDOW_SECS),
        };
        if stale && !self.suppressed.is_empty() {
            debug!("Clearing stale fan-out suppression entries");
            self.suppressed.clear();
        }
    }

    /// Whether a notification from this entity should be dropped
    pub fn is_suppressed(&self, entity_id: &EntityId) -> bool {
        self.suppressed.contains(entity_id)
    }

    /// Record entities about to be commanded, before any command is issued
    pub fn suppress(&mut self, entity_ids: impl IntoIterator<Item = EntityId>) {
        self.suppressed.extend(entity_ids);
    }

    /// Record the timestamp of a notification that was actually processed
    pub fn mark_processed(&mut self, at: DateTime<Utc>) {
        self.window_opened_at = Some(at);
    }

    /// Drop all suppression state; used on teardown and resubscribe
    pub fn reset(&mut self) {
        self.suppressed.clear();
        self.window_opened_at = None;
    }
}
