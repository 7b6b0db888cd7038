use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::launch::LaunchDirectives;
use crate::zones::scheduler::RunId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WidgetState {
    /// Trigger visible, animation hidden.
    Default,
    /// Trigger fired; a run is active or about to start.
    AnimationActive,
    /// Terminal for the session.
    Resolved,
}

impl WidgetState {
    /// Startup resolution. Suppression and an existing claim win over an
    /// immediate-activation request.
    pub fn initial(directives: LaunchDirectives, claimed: bool) -> Self {
        if directives.suppress_mascot || claimed {
            WidgetState::Resolved
        } else if directives.activate_immediately {
            WidgetState::AnimationActive
        } else {
            WidgetState::Default
        }
    }
}

/// How a run came to an end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunOutcome {
    Caught,
    TimedOut,
    Stopped,
}

/// One execution of the timed animation.
#[derive(Debug, Clone)]
pub struct AnimationRun {
    pub id: RunId,
    pub started_at: Instant,
    pub duration: Duration,
    pub resolved: bool,
}

impl AnimationRun {
    pub fn new(id: RunId, started_at: Instant, duration: Duration) -> Self {
        Self {
            id,
            started_at,
            duration,
            resolved: false,
        }
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn is_over_at(&self, now: Instant) -> bool {
        self.elapsed_at(now) >= self.duration
    }
}

/// Read-only view of the controller for callers and tests.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub state: WidgetState,
    pub trigger_fired: bool,
    pub run_id: Option<RunId>,
    pub elapsed_ms: Option<u64>,
    pub visible_zones: Vec<String>,
    pub sound_on: bool,
    pub debug_zones: bool,
    /// Live run tasks plus deferred presentation timers.
    pub pending_tasks: usize,
    pub last_outcome: Option<RunOutcome>,
}
