//! Per-target hysteresis state.

use super::event_log::{Direction, EventLog};
use crate::probe::{ProbeOutcome, ProbeStatus};
use crate::store::Target;

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Runtime view of one target, derived from repeated probing.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeState {
    pub status: ProbeStatus,
    pub last_latency: Duration,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub last_check: Option<DateTime<Utc>>,
    pub failure_count: u32,
    pub success_count: u32,
    /// Debounced verdict; starts online so a restart never alerts by itself.
    pub confirmed_online: bool,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            status: ProbeStatus::NotProbed,
            last_latency: Duration::ZERO,
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            last_check: None,
            failure_count: 0,
            success_count: 0,
            confirmed_online: true,
        }
    }
}

impl RuntimeState {
    /// Apply a probe outcome and return the confirmed transition, if any.
    ///
    /// The counter that triggers a transition is not reset by it; only the
    /// opposite classification resets a counter.
    pub fn record(
        &mut self,
        outcome: &ProbeOutcome,
        target: &Target,
        at: DateTime<Utc>,
    ) -> Option<Direction> {
        self.status = outcome.status;
        self.last_check = Some(at);
        self.update_latency(outcome.latency);

        if outcome.status.is_up() {
            self.failure_count = 0;
            self.success_count = self.success_count.saturating_add(1);

            if !self.confirmed_online && self.success_count >= target.recovery_threshold.max(1) {
                self.confirmed_online = true;
                return Some(Direction::Online);
            }
        } else {
            self.success_count = 0;
            self.failure_count = self.failure_count.saturating_add(1);

            if self.confirmed_online && self.failure_count >= target.failure_threshold.max(1) {
                self.confirmed_online = false;
                return Some(Direction::Offline);
            }
        }

        None
    }

    fn update_latency(&mut self, latency: Duration) {
        self.last_latency = latency;
        if !latency.is_zero() && (self.min_latency.is_zero() || latency < self.min_latency) {
            self.min_latency = latency;
        }
        if latency > self.max_latency {
            self.max_latency = latency;
        }
    }
}

/// Everything the engine tracks for one target.
#[derive(Debug, Clone, Default)]
pub struct TargetRuntime {
    pub state: RuntimeState,
    pub log: EventLog,
}
