//! Round engine: detects round closes and drives settlement.
//!
//! Fed the currently confirmed history once per poll. A change from the
//! previously confirmed history means the round in progress has closed; its
//! outcome is the newest symbol. The one pending pick is settled against it
//! and a pick for the next round is requested.

use tracing::{info, warn};

use crate::engine::accountant::Accountant;
use crate::llm::{PendingPick, PredictionService};
use crate::report::ReportSink;
use crate::strategy::bankroll::Bankroll;
use crate::types::{RoundRecord, SessionSummary, SymbolSequence};

#[derive(Debug, Clone, PartialEq)]
enum RoundState {
    AwaitingFirstConfirmation,
    AwaitingClose {
        previous: SymbolSequence,
        pending: PendingPick,
    },
    Finished,
}

/// What a single `on_confirmed` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// First history confirmed; a pick for the upcoming round is pending.
    Opened(PendingPick),
    Unchanged,
    Closed(RoundRecord),
    /// Closed, and the bet limit has been reached.
    Finished(RoundRecord),
}

pub struct RoundEngine {
    state: RoundState,
    predictions: PredictionService,
    bankroll: Bankroll,
    accountant: Accountant,
    sink: Box<dyn ReportSink>,
    max_bets: u64,
}

impl RoundEngine {
    /// `max_bets` counts settled non-NoBet rounds.
    pub fn new(
        predictions: PredictionService,
        bankroll: Bankroll,
        sink: Box<dyn ReportSink>,
        max_bets: u64,
    ) -> Self {
        Self {
            state: RoundState::AwaitingFirstConfirmation,
            predictions,
            bankroll,
            accountant: Accountant::new(),
            sink,
            max_bets,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == RoundState::Finished
    }

    pub fn bankroll(&self) -> &Bankroll {
        &self.bankroll
    }

    pub fn accountant(&self) -> &Accountant {
        &self.accountant
    }

    /// The pick held for the round in progress, if any.
    pub fn pending(&self) -> Option<PendingPick> {
        match &self.state {
            RoundState::AwaitingClose { pending, .. } => Some(*pending),
            _ => None,
        }
    }

    pub async fn on_confirmed(&mut self, confirmed: &SymbolSequence) -> RoundEvent {
        let pending = match &self.state {
            RoundState::Finished => return RoundEvent::Unchanged,
            RoundState::AwaitingClose { previous, .. } if previous == confirmed => {
                return RoundEvent::Unchanged;
            }
            RoundState::AwaitingClose { pending, .. } => Some(*pending),
            RoundState::AwaitingFirstConfirmation => None,
        };

        let Some(pending) = pending else {
            let pick = self.next_pick(confirmed).await;
            info!(
                session = %self.accountant.session_id(),
                predictor = self.predictions.predictor_name(),
                history = %confirmed,
                pick = %pick.prediction,
                source = ?pick.source,
                "New session: first history confirmed"
            );
            return RoundEvent::Opened(pick);
        };

        let Some(actual) = confirmed.last() else {
            warn!("Confirmed history is empty, ignoring");
            return RoundEvent::Unchanged;
        };

        let result = self.bankroll.on_round(pending.prediction, actual);
        let record = self
            .accountant
            .on_settled(confirmed, &pending, actual, result, &self.bankroll);
        self.sink.on_round(&record);

        if self.bankroll.rounds_bet() >= self.max_bets {
            info!(
                bets = self.bankroll.rounds_bet(),
                limit = self.max_bets,
                "Bet limit reached"
            );
            self.state = RoundState::Finished;
            return RoundEvent::Finished(record);
        }

        self.next_pick(confirmed).await;
        RoundEvent::Closed(record)
    }

    async fn next_pick(&mut self, history: &SymbolSequence) -> PendingPick {
        let pick = self.predictions.request(history).await;
        self.accountant.on_pick(&pick);
        self.state = RoundState::AwaitingClose {
            previous: history.clone(),
            pending: pick,
        };
        pick
    }

    /// Build the session summary and hand it to the sink.
    pub fn finish(&mut self) -> SessionSummary {
        let summary = self.accountant.summary(&self.bankroll);
        self.sink.on_summary(&summary);
        summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
