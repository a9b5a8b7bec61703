//! Report sinks.
//!
//! Receive one record per settled round and the session summary at
//! shutdown. `TracingSink` writes them to the log; `MemorySink` keeps them
//! in memory for tests and embedders.

use std::sync::{Arc, Mutex};
use tracing::info;

use crate::types::{RoundRecord, SessionSummary};

pub trait ReportSink: Send {
    fn on_round(&mut self, record: &RoundRecord);
    fn on_summary(&mut self, summary: &SessionSummary);
}

// ---------------------------------------------------------------------------
// Tracing sink
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn on_round(&mut self, record: &RoundRecord) {
        info!(
            round = record.round,
            history = %record.history,
            pred = %record.predicted,
            source = ?record.source,
            actual = %record.actual,
            result = %record.result,
            acc = format!("{:.2}%", record.cumulative_accuracy * 100.0),
            pnl = format!("{:.2}", record.profit),
            next_stake = format!("{:.2}", record.next_stake),
            "Round settled"
        );
    }

    fn on_summary(&mut self, summary: &SessionSummary) {
        info!(
            session = %summary.session_id,
            rounds_settled = summary.rounds_settled,
            bets_placed = summary.bets_placed,
            accuracy = format!("{:.2}%", summary.accuracy_on_bets * 100.0),
            bankroll = %summary.bankroll,
            confusion = %summary.confusion,
            fallback_used = summary.fallback.used,
            fallback_correct = summary.fallback.correct,
            "Session summary"
        );
    }
}

// ---------------------------------------------------------------------------
// Memory sink
// ---------------------------------------------------------------------------

/// Collects everything it receives. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    rounds: Arc<Mutex<Vec<RoundRecord>>>,
    summaries: Arc<Mutex<Vec<SessionSummary>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rounds(&self) -> Vec<RoundRecord> {
        self.rounds.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.summaries.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn on_round(&mut self, record: &RoundRecord) {
        if let Ok(mut rounds) = self.rounds.lock() {
            rounds.push(record.clone());
        }
    }

    fn on_summary(&mut self, summary: &SessionSummary) {
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.push(summary.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
