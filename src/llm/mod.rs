//! Predictor integration for next-round picks.
//!
//! Defines the `Predictor` trait, the timeout guard that collapses every
//! failure into a tagged reply, and the implementations: an
//! OpenAI-compatible chat client and a local subprocess predictor.

pub mod chat;
pub mod command;
pub mod parse;
pub mod service;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::types::{Prediction, SymbolSequence};
use parse::{parse_pick, ParsedPick};

pub use service::{PendingPick, PredictionService, PredictorSettings};

/// Abstraction over next-round predictors.
///
/// Implementors return the raw response payload; interpretation is left to
/// the tolerant parser so that every provider shares one fallback chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Ask for a pick given the confirmed history. `retry` is set on the
    /// second attempt after an abstention.
    async fn predict(&self, history: &SymbolSequence, retry: bool) -> Result<String>;

    /// Identifier used in logs.
    fn name(&self) -> &str;
}

/// JSON context sent to every predictor.
pub fn request_context(history: &SymbolSequence, retry: bool) -> String {
    let mut ctx = serde_json::json!({ "history": history.to_string() });
    if retry {
        ctx["retry"] = serde_json::Value::Bool(true);
    }
    ctx.to_string()
}

// ---------------------------------------------------------------------------
// Timeout guard
// ---------------------------------------------------------------------------

/// Outcome of one guarded predictor call.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictorReply {
    Answered(ParsedPick),
    TimedOut,
    Failed(String),
}

impl PredictorReply {
    /// Anything other than a parsed answer abstains.
    pub fn prediction(&self) -> Prediction {
        match self {
            PredictorReply::Answered(parsed) => parsed.prediction,
            PredictorReply::TimedOut | PredictorReply::Failed(_) => Prediction::NoBet,
        }
    }
}

/// Run one predictor call under a hard timeout.
pub async fn call_with_timeout(
    predictor: &dyn Predictor,
    history: &SymbolSequence,
    retry: bool,
    timeout: Duration,
) -> PredictorReply {
    match tokio::time::timeout(timeout, predictor.predict(history, retry)).await {
        Ok(Ok(text)) => PredictorReply::Answered(parse_pick(&text)),
        Ok(Err(e)) => {
            warn!(predictor = predictor.name(), error = %e, "Predictor failed, treating as NOBET");
            PredictorReply::Failed(format!("{e:#}"))
        }
        Err(_) => {
            warn!(
                predictor = predictor.name(),
                timeout_ms = timeout.as_millis() as u64,
                "Predictor timed out, treating as NOBET"
            );
            PredictorReply::TimedOut
        }
    }
}

// ---------------------------------------------------------------------------
// Abstaining predictor
// ---------------------------------------------------------------------------

/// Predictor used when nothing is configured: always abstains.
pub struct AbstainPredictor;

#[async_trait]
impl Predictor for AbstainPredictor {
    async fn predict(&self, _history: &SymbolSequence, _retry: bool) -> Result<String> {
        Ok(r#"{"pick":"SKIP"}"#.to_string())
    }

    fn name(&self) -> &str {
        "abstain"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
