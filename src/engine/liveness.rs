//! Heartbeat and stall monitor.
//!
//! Purely informational: signals are logged and returned, they never touch
//! round or bankroll state.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSignal {
    Heartbeat,
    /// No round has closed for `idle`.
    Stall { idle: Duration },
}

#[derive(Debug, Clone)]
pub struct Liveness {
    heartbeat: Duration,
    stall_after: Duration,
    last_heartbeat: Option<Instant>,
    /// Set once the first history is confirmed; stalls are only reported after that.
    last_close: Option<Instant>,
}

impl Liveness {
    pub fn new(heartbeat: Duration, stall_after: Duration) -> Self {
        Self {
            heartbeat,
            stall_after,
            last_heartbeat: None,
            last_close: None,
        }
    }

    /// Record a session start or a round close.
    pub fn mark_close(&mut self, now: Instant) {
        self.last_close = Some(now);
        self.last_heartbeat = Some(now);
    }

    /// Called once per poll. The first heartbeat fires immediately.
    pub fn tick(&mut self, now: Instant) -> Vec<LivenessSignal> {
        let mut signals = Vec::new();

        let heartbeat_due = self
            .last_heartbeat
            .map_or(true, |t| now.saturating_duration_since(t) >= self.heartbeat);
        if heartbeat_due {
            self.last_heartbeat = Some(now);
            let idle_secs = self
                .last_close
                .map(|t| now.saturating_duration_since(t).as_secs());
            info!(idle_secs = ?idle_secs, "Heartbeat: waiting for round close");
            signals.push(LivenessSignal::Heartbeat);
        }

        if let Some(last) = self.last_close {
            let idle = now.saturating_duration_since(last);
            if idle >= self.stall_after {
                warn!(idle_secs = idle.as_secs(), "No round close detected, sampler may be stuck");
                // Re-arm so the warning repeats once per stall period.
                self.last_close = Some(now);
                signals.push(LivenessSignal::Stall { idle });
            }
        }

        signals
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
