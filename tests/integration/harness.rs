//! Deterministic test doubles for the round pipeline.
//!
//! `ScriptedPredictor` replays canned payloads; `Pipeline` drives the
//! digitizer, stability window and round engine one poll at a time without
//! any timers.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roundwatch::engine::{RoundEngine, RoundEvent};
use roundwatch::llm::{PredictionService, Predictor, PredictorSettings};
use roundwatch::report::MemorySink;
use roundwatch::signal::{Digitizer, StabilityWindow};
use roundwatch::strategy::{Bankroll, BankrollConfig};
use roundwatch::types::SymbolSequence;

pub const HIGH: f64 = 200.0;
pub const LOW: f64 = 20.0;

/// Brightness frame for a `T`/`X` pattern.
pub fn frame(pattern: &str) -> Vec<f64> {
    pattern
        .chars()
        .map(|c| if c == 'X' { LOW } else { HIGH })
        .collect()
}

/// Calls seen by a `ScriptedPredictor`: (history, retry).
pub type CallLog = Arc<Mutex<Vec<(String, bool)>>>;

pub struct ScriptedPredictor {
    answers: Mutex<VecDeque<String>>,
    calls: CallLog,
    delay: Option<Duration>,
}

impl ScriptedPredictor {
    /// Returns `answers` in order, then `{"pick":"SKIP"}`.
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Sleeps `delay` before every answer.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(&self, history: &SymbolSequence, retry: bool) -> Result<String> {
        self.calls.lock().unwrap().push((history.to_string(), retry));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.answers.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| r#"{"pick":"SKIP"}"#.to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn quick_settings(retry_on_skip: bool, heuristic_fallback: bool) -> PredictorSettings {
    PredictorSettings {
        timeout: Duration::from_millis(200),
        retry_on_skip,
        heuristic_fallback,
    }
}

pub struct Pipeline {
    digitizer: Digitizer,
    pub window: StabilityWindow,
    pub engine: RoundEngine,
    pub sink: MemorySink,
}

impl Pipeline {
    pub fn new(
        predictor: impl Predictor + 'static,
        settings: PredictorSettings,
        bankroll: BankrollConfig,
        required_stable: u32,
        max_bets: u64,
    ) -> Self {
        let sink = MemorySink::new();
        let engine = RoundEngine::new(
            PredictionService::new(Box::new(predictor), settings),
            Bankroll::new(bankroll).expect("valid bankroll"),
            Box::new(sink.clone()),
            max_bets,
        );
        Self {
            digitizer: Digitizer::new(13),
            window: StabilityWindow::new(required_stable),
            engine,
            sink,
        }
    }

    /// One poll tick reading `samples`.
    pub async fn poll(&mut self, samples: &[f64]) -> Option<RoundEvent> {
        let raw = self.digitizer.digitize(samples).ok()?;
        self.window.observe(raw);
        let confirmed = self.window.confirmed()?.clone();
        Some(self.engine.on_confirmed(&confirmed).await)
    }

    /// `polls` identical ticks of the frame for `pattern`.
    pub async fn hold(&mut self, pattern: &str, polls: usize) -> Vec<RoundEvent> {
        let samples = frame(pattern);
        let mut events = Vec::new();
        for _ in 0..polls {
            if let Some(event) = self.poll(&samples).await {
                if event != RoundEvent::Unchanged {
                    events.push(event);
                }
            }
        }
        events
    }
}
