//! Control loop.
//!
//! Wakes once per poll interval, reads the latest digitized history from
//! the shared slot, feeds it through the stability window and hands the
//! confirmed history to the round engine. Ends on the shutdown future or
//! once the engine reaches its bet limit; either way the session summary is
//! reported.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::liveness::{Liveness, LivenessSignal};
use crate::engine::round::{RoundEngine, RoundEvent};
use crate::sampler::Slot;
use crate::signal::StabilityWindow;
use crate::types::SessionSummary;

pub struct Runner {
    engine: RoundEngine,
    window: StabilityWindow,
    liveness: Liveness,
    heartbeats: u64,
    stalls: u64,
    poll_interval: Duration,
    round_length: usize,
}

impl Runner {
    pub fn new(engine: RoundEngine, config: &EngineConfig) -> Self {
        Self {
            engine,
            window: StabilityWindow::new(config.required_stable),
            liveness: Liveness::new(config.heartbeat(), config.stall_after()),
            heartbeats: 0,
            stalls: 0,
            poll_interval: config.poll_interval(),
            round_length: config.round_length,
        }
    }

    pub async fn run<F>(mut self, slot: Slot, shutdown: F) -> SessionSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            required_stable = self.window.required(),
            "Entering control loop. Press Ctrl+C to stop."
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.poll(&slot).await {
                        break;
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    break;
                }
            }
        }

        info!(
            heartbeats = self.heartbeats,
            stalls = self.stalls,
            "Control loop finished"
        );
        self.engine.finish()
    }

    /// One tick. Returns true once the session is over.
    async fn poll(&mut self, slot: &Slot) -> bool {
        let now = Instant::now();
        let raw = slot.borrow().clone();

        match raw {
            Some(seq) if seq.len() == self.round_length => {
                self.window.observe(seq);
            }
            other => {
                debug!(got = ?other.map(|s| s.len()), "No usable sample this tick");
                self.check_liveness(now);
                return false;
            }
        }

        if let Some(confirmed) = self.window.confirmed().cloned() {
            match self.engine.on_confirmed(&confirmed).await {
                RoundEvent::Unchanged => {}
                RoundEvent::Opened(_) | RoundEvent::Closed(_) => self.liveness.mark_close(now),
                RoundEvent::Finished(_) => return true,
            }
        }

        self.check_liveness(now);
        self.engine.is_finished()
    }

    fn check_liveness(&mut self, now: Instant) {
        for signal in self.liveness.tick(now) {
            match signal {
                LivenessSignal::Heartbeat => self.heartbeats += 1,
                LivenessSignal::Stall { .. } => self.stalls += 1,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
