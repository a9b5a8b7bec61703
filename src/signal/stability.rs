//! Stability window.
//!
//! Debounces the digitized history: a raw sequence is only accepted as
//! confirmed after it has been read `required` times in a row. A single
//! flickering read resets the count for the new candidate but leaves the
//! previously confirmed sequence in place.

use tracing::debug;

use crate::types::SymbolSequence;

#[derive(Debug, Clone)]
pub struct StabilityWindow {
    required: u32,
    candidate: Option<SymbolSequence>,
    confirmed: Option<SymbolSequence>,
    stable_count: u32,
}

impl StabilityWindow {
    /// `required` is clamped to at least 1.
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            candidate: None,
            confirmed: None,
            stable_count: 0,
        }
    }

    /// Feed one raw read. Returns the candidate on the poll where it reaches
    /// the K-th consecutive identical observation, `None` otherwise.
    pub fn observe(&mut self, raw: SymbolSequence) -> Option<SymbolSequence> {
        if self.candidate.as_ref() == Some(&raw) {
            self.stable_count = self.stable_count.saturating_add(1);
        } else {
            self.candidate = Some(raw);
            self.stable_count = 1;
        }

        if self.stable_count < self.required {
            return None;
        }

        let candidate = self.candidate.clone()?;
        if self.stable_count == self.required {
            debug!(history = %candidate, polls = self.stable_count, "History confirmed");
            self.confirmed = Some(candidate.clone());
            return Some(candidate);
        }
        None
    }

    /// Last sequence that reached the required count.
    pub fn confirmed(&self) -> Option<&SymbolSequence> {
        self.confirmed.as_ref()
    }

    pub fn candidate(&self) -> Option<&SymbolSequence> {
        self.candidate.as_ref()
    }

    pub fn stable_count(&self) -> u32 {
        self.stable_count
    }

    pub fn required(&self) -> u32 {
        self.required
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
