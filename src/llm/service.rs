//! Pick acquisition with retry and local fallback.
//!
//! One guarded predictor call; on abstention an optional second call with
//! the retry flag; if that abstains too, an optional deterministic local
//! pick. Every path yields a `PendingPick`, so the round pipeline never
//! blocks on or fails because of the predictor.

use std::time::Duration;
use tracing::{debug, info};

use super::{call_with_timeout, Predictor};
use crate::strategy::heuristic::fallback_pick;
use crate::types::{PickSource, Prediction, SymbolSequence};

#[derive(Debug, Clone)]
pub struct PredictorSettings {
    /// Hard timeout per predictor call.
    pub timeout: Duration,
    pub retry_on_skip: bool,
    pub heuristic_fallback: bool,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(12),
            retry_on_skip: true,
            heuristic_fallback: true,
        }
    }
}

/// Prediction held for the round currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPick {
    pub prediction: Prediction,
    pub source: PickSource,
}

pub struct PredictionService {
    predictor: Box<dyn Predictor>,
    settings: PredictorSettings,
}

impl PredictionService {
    pub fn new(predictor: Box<dyn Predictor>, settings: PredictorSettings) -> Self {
        Self { predictor, settings }
    }

    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }

    /// Obtain a pick for the round following `history`.
    pub async fn request(&self, history: &SymbolSequence) -> PendingPick {
        let timeout = self.settings.timeout;
        let first = call_with_timeout(&*self.predictor, history, false, timeout).await;
        let prediction = first.prediction();
        if prediction.is_bet() {
            return PendingPick { prediction, source: PickSource::Predictor };
        }

        if self.settings.retry_on_skip {
            debug!(history = %history, "Predictor abstained, retrying once");
            let second = call_with_timeout(&*self.predictor, history, true, timeout).await;
            let prediction = second.prediction();
            if prediction.is_bet() {
                return PendingPick { prediction, source: PickSource::Retry };
            }
        }

        if self.settings.heuristic_fallback {
            let prediction = fallback_pick(history);
            info!(history = %history, prediction = %prediction, "Heuristic fallback pick");
            return PendingPick { prediction, source: PickSource::Heuristic };
        }

        PendingPick { prediction: Prediction::NoBet, source: PickSource::Predictor }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
