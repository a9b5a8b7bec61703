//! Shared types for the ROUNDWATCH engine.
//!
//! These types form the data model used across all modules: the binary
//! round symbols, confirmed histories, predictions, and the records handed
//! to report sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::strategy::bankroll::BankrollSummary;

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// Outcome label of a single round.
///
/// `A` renders as `T`, `B` renders as `X` in history strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    A,
    B,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::A => 'T',
            Symbol::B => 'X',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'T' | 'A' => Some(Symbol::A),
            'X' | 'B' => Some(Symbol::B),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Symbol::A => Symbol::B,
            Symbol::B => Symbol::A,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Ground-truth symbol of a just-closed round.
pub type Outcome = Symbol;

// ---------------------------------------------------------------------------
// Symbol sequence
// ---------------------------------------------------------------------------

/// Ordered round history, oldest first, newest last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolSequence(Vec<Symbol>);

impl SymbolSequence {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent symbol.
    pub fn last(&self) -> Option<Symbol> {
        self.0.last().copied()
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }
}

impl fmt::Display for SymbolSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.0 {
            write!(f, "{}", s.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for SymbolSequence {
    type Err = RoundwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .chars()
            .map(|c| {
                Symbol::from_char(c)
                    .ok_or_else(|| RoundwatchError::Digitize(format!("invalid symbol '{c}'")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Forecast for the upcoming round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prediction {
    PickA,
    PickB,
    NoBet,
}

impl Prediction {
    /// The pick that backs a given symbol.
    pub fn backing(symbol: Symbol) -> Self {
        match symbol {
            Symbol::A => Prediction::PickA,
            Symbol::B => Prediction::PickB,
        }
    }

    /// The symbol this prediction wagers on, if any.
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Prediction::PickA => Some(Symbol::A),
            Prediction::PickB => Some(Symbol::B),
            Prediction::NoBet => None,
        }
    }

    pub fn is_bet(self) -> bool {
        self != Prediction::NoBet
    }

    /// Map a predictor pick token to a prediction. Unknown tokens abstain.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "T" | "TAI" | "A" | "PICKA" => Prediction::PickA,
            "X" | "XIU" | "B" | "PICKB" => Prediction::PickB,
            _ => Prediction::NoBet,
        }
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::PickA => write!(f, "PICK_{}", Symbol::A),
            Prediction::PickB => write!(f, "PICK_{}", Symbol::B),
            Prediction::NoBet => write!(f, "NOBET"),
        }
    }
}

// ---------------------------------------------------------------------------
// Round results and records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoundResult {
    Win,
    Lose,
    NoBet,
}

impl fmt::Display for RoundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundResult::Win => write!(f, "WIN"),
            RoundResult::Lose => write!(f, "LOSE"),
            RoundResult::NoBet => write!(f, "NOBET"),
        }
    }
}

/// Where the pending prediction for a round came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickSource {
    Predictor,
    /// Produced by the predictor on the retry call.
    Retry,
    /// Produced locally by the heuristic after the predictor abstained.
    Heuristic,
}

/// Per-round record handed to the report sink after settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub timestamp: DateTime<Utc>,
    /// 1-based count of settled rounds (NoBet rounds included).
    pub round: u64,
    pub history: SymbolSequence,
    pub predicted: Prediction,
    pub source: PickSource,
    pub actual: Outcome,
    pub result: RoundResult,
    /// Accuracy over rounds with a wager, 0.0–1.0.
    pub cumulative_accuracy: f64,
    pub profit: f64,
    pub next_stake: f64,
}

impl fmt::Display for RoundRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Round={} | pred={} actual={} result={} | acc={:.2}% | pnl={:.2} | nextStake={:.2}",
            self.round,
            self.predicted,
            self.actual,
            self.result,
            self.cumulative_accuracy * 100.0,
            self.profit,
            self.next_stake,
        )
    }
}

/// Prediction-vs-outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub pick_a_actual_a: u64,
    pub pick_a_actual_b: u64,
    pub pick_b_actual_b: u64,
    pub pick_b_actual_a: u64,
    pub no_bet_actual_a: u64,
    pub no_bet_actual_b: u64,
}

impl ConfusionMatrix {
    pub fn record(&mut self, prediction: Prediction, actual: Outcome) {
        let cell = match (prediction, actual) {
            (Prediction::PickA, Symbol::A) => &mut self.pick_a_actual_a,
            (Prediction::PickA, Symbol::B) => &mut self.pick_a_actual_b,
            (Prediction::PickB, Symbol::B) => &mut self.pick_b_actual_b,
            (Prediction::PickB, Symbol::A) => &mut self.pick_b_actual_a,
            (Prediction::NoBet, Symbol::A) => &mut self.no_bet_actual_a,
            (Prediction::NoBet, Symbol::B) => &mut self.no_bet_actual_b,
        };
        *cell += 1;
    }

    pub fn total(&self) -> u64 {
        self.pick_a_actual_a
            + self.pick_a_actual_b
            + self.pick_b_actual_b
            + self.pick_b_actual_a
            + self.no_bet_actual_a
            + self.no_bet_actual_b
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A->T:{} A->X:{} | B->X:{} B->T:{} | NOBET->T:{} NOBET->X:{}",
            self.pick_a_actual_a,
            self.pick_a_actual_b,
            self.pick_b_actual_b,
            self.pick_b_actual_a,
            self.no_bet_actual_a,
            self.no_bet_actual_b,
        )
    }
}

/// Usage of the local heuristic fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackStats {
    pub used: u64,
    pub correct: u64,
}

impl FallbackStats {
    pub fn accuracy(&self) -> f64 {
        if self.used == 0 {
            0.0
        } else {
            self.correct as f64 / self.used as f64
        }
    }
}

/// End-of-run summary handed to the report sink at shutdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub rounds_settled: u64,
    pub bets_placed: u64,
    pub accuracy_on_bets: f64,
    pub bankroll: BankrollSummary,
    pub confusion: ConfusionMatrix,
    pub fallback: FallbackStats,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== SUMMARY ({}) =====", self.session_id)?;
        writeln!(f, "Rounds settled: {}", self.rounds_settled)?;
        writeln!(f, "Bets placed: {}", self.bets_placed)?;
        writeln!(f, "Accuracy on bets: {:.2}%", self.accuracy_on_bets * 100.0)?;
        writeln!(f, "{}", self.bankroll)?;
        writeln!(f, "Confusion: {}", self.confusion)?;
        write!(
            f,
            "Heuristic fallback: used={} correct={} (accuracy={:.2}%)",
            self.fallback.used,
            self.fallback.correct,
            self.fallback.accuracy() * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for ROUNDWATCH.
#[derive(Debug, thiserror::Error)]
pub enum RoundwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Predictor error ({predictor}): {message}")]
    Predictor { predictor: String, message: String },

    #[error("Sampler error: {0}")]
    Sampler(String),

    #[error("Digitize error: {0}")]
    Digitize(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
