//! Sample acquisition.
//!
//! A background task polls a `Sampler` at a fixed period, digitizes each
//! frame and overwrites a single latest-value slot. The control loop reads
//! the slot whenever it likes; intermediate frames may be skipped and the
//! producer never waits on the reader.

pub mod replay;

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::signal::Digitizer;
use crate::types::SymbolSequence;

pub use replay::ReplaySampler;

/// Source of raw brightness frames. `None` means nothing could be read.
pub trait Sampler: Send {
    fn sample(&mut self) -> Option<Vec<f64>>;
}

/// Latest digitized history, `None` after a failed read.
pub type Slot = watch::Receiver<Option<SymbolSequence>>;

/// A fresh, empty latest-value slot.
pub fn latest_slot() -> (watch::Sender<Option<SymbolSequence>>, Slot) {
    watch::channel(None)
}

pub struct SampleProducer<S> {
    sampler: S,
    digitizer: Digitizer,
    period: Duration,
}

impl<S: Sampler + 'static> SampleProducer<S> {
    pub fn new(sampler: S, digitizer: Digitizer, period: Duration) -> Self {
        Self {
            sampler,
            digitizer,
            period,
        }
    }

    /// Run on the runtime until every receiver of `tx` is gone.
    pub fn spawn(self, tx: watch::Sender<Option<SymbolSequence>>) -> JoinHandle<()> {
        tokio::spawn(self.run(tx))
    }

    async fn run(mut self, tx: watch::Sender<Option<SymbolSequence>>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            period_ms = self.period.as_millis() as u64,
            round_length = self.digitizer.round_length(),
            "Sampler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tx.closed() => break,
            }
            tx.send_replace(self.read_once());
        }

        info!("Sampler stopped");
    }

    fn read_once(&mut self) -> Option<SymbolSequence> {
        let frame = self.sampler.sample()?;
        match self.digitizer.digitize(&frame) {
            Ok(seq) => Some(seq),
            Err(e) => {
                debug!(error = %e, "Frame rejected");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
