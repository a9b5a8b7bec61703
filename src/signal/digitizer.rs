//! Brightness digitizer.
//!
//! Splits a fixed-size row of brightness samples into two classes with a
//! scalar 2-means pass and maps each sample to a round symbol. Samples
//! strictly below the midpoint of the two centroids become `B`, the rest `A`.

use tracing::trace;

use crate::types::{RoundwatchError, Symbol, SymbolSequence};

/// Maximum refinement passes of the 2-means loop.
const MAX_ITERATIONS: usize = 10;

/// Both centroids must move less than this for early termination.
const CONVERGENCE_EPSILON: f64 = 0.01;

/// Order statistic used to seed each centroid (0-based, from either end).
const SEED_RANK: usize = 3;

#[derive(Debug, Clone)]
pub struct Digitizer {
    round_length: usize,
}

impl Digitizer {
    pub fn new(round_length: usize) -> Self {
        Self { round_length }
    }

    pub fn round_length(&self) -> usize {
        self.round_length
    }

    /// Digitize exactly `round_length` samples.
    pub fn digitize(&self, samples: &[f64]) -> Result<SymbolSequence, RoundwatchError> {
        if samples.len() != self.round_length {
            return Err(RoundwatchError::Digitize(format!(
                "expected {} samples, got {}",
                self.round_length,
                samples.len()
            )));
        }
        if let Some(bad) = samples.iter().find(|v| !v.is_finite()) {
            return Err(RoundwatchError::Digitize(format!("non-finite sample {bad}")));
        }

        let threshold = two_means_threshold(samples);
        let symbols = samples
            .iter()
            .map(|&v| if v < threshold { Symbol::B } else { Symbol::A })
            .collect();

        Ok(SymbolSequence::new(symbols))
    }
}

/// Midpoint of the two centroids found by 1-D 2-means.
pub fn two_means_threshold(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let rank = SEED_RANK.min(n.saturating_sub(1) / 2);
    let mut low = sorted[rank];
    let mut high = sorted[n - 1 - rank];

    for iteration in 0..MAX_ITERATIONS {
        let (mut low_sum, mut low_count) = (0.0, 0usize);
        let (mut high_sum, mut high_count) = (0.0, 0usize);

        for &v in samples {
            // ties go to the low centroid
            if (v - low).abs() <= (v - high).abs() {
                low_sum += v;
                low_count += 1;
            } else {
                high_sum += v;
                high_count += 1;
            }
        }

        let next_low = if low_count > 0 { low_sum / low_count as f64 } else { low };
        let next_high = if high_count > 0 { high_sum / high_count as f64 } else { high };

        let converged = (next_low - low).abs() < CONVERGENCE_EPSILON
            && (next_high - high).abs() < CONVERGENCE_EPSILON;
        low = next_low;
        high = next_high;

        if converged {
            trace!(iteration, low, high, "2-means converged");
            break;
        }
    }

    (low + high) / 2.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
