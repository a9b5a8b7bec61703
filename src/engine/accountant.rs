//! Accountant: accuracy, confusion matrix and fallback usage.
//!
//! Records every settled round against the bankroll's result and builds the
//! per-round record and the end-of-session summary.

use chrono::Utc;
use uuid::Uuid;

use crate::llm::PendingPick;
use crate::strategy::bankroll::Bankroll;
use crate::types::{
    ConfusionMatrix, FallbackStats, Outcome, PickSource, RoundRecord, RoundResult,
    SessionSummary, SymbolSequence,
};

#[derive(Debug, Clone)]
pub struct Accountant {
    session_id: Uuid,
    settled_rounds: u64,
    correct_on_bets: u64,
    confusion: ConfusionMatrix,
    fallback: FallbackStats,
}

impl Default for Accountant {
    fn default() -> Self {
        Self::new()
    }
}

impl Accountant {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            settled_rounds: 0,
            correct_on_bets: 0,
            confusion: ConfusionMatrix::default(),
            fallback: FallbackStats::default(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Count a pick handed out for an upcoming round.
    pub fn on_pick(&mut self, pick: &PendingPick) {
        if pick.source == PickSource::Heuristic {
            self.fallback.used += 1;
        }
    }

    /// Record a settlement the bankroll has already applied.
    pub fn on_settled(
        &mut self,
        history: &SymbolSequence,
        pick: &PendingPick,
        actual: Outcome,
        result: RoundResult,
        bankroll: &Bankroll,
    ) -> RoundRecord {
        self.settled_rounds += 1;
        self.confusion.record(pick.prediction, actual);

        if result == RoundResult::Win {
            self.correct_on_bets += 1;
            if pick.source == PickSource::Heuristic {
                self.fallback.correct += 1;
            }
        }

        RoundRecord {
            timestamp: Utc::now(),
            round: self.settled_rounds,
            history: history.clone(),
            predicted: pick.prediction,
            source: pick.source,
            actual,
            result,
            cumulative_accuracy: self.accuracy(bankroll.rounds_bet()),
            profit: bankroll.profit(),
            next_stake: bankroll.stake(),
        }
    }

    fn accuracy(&self, bets: u64) -> f64 {
        if bets == 0 {
            0.0
        } else {
            self.correct_on_bets as f64 / bets as f64
        }
    }

    pub fn summary(&self, bankroll: &Bankroll) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id,
            rounds_settled: self.settled_rounds,
            bets_placed: bankroll.rounds_bet(),
            accuracy_on_bets: self.accuracy(bankroll.rounds_bet()),
            bankroll: bankroll.summary(),
            confusion: self.confusion,
            fallback: self.fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
