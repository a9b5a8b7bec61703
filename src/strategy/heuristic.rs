//! Local pick heuristic used when the predictor abstains.
//!
//! Looks at the last two symbols only: a repeated symbol is played against
//! (anti-run), an alternation is followed.

use crate::types::{Prediction, SymbolSequence};

pub fn fallback_pick(history: &SymbolSequence) -> Prediction {
    match history.symbols() {
        [.., prev, last] if prev == last => Prediction::backing(last.opposite()),
        [.., last] if history.len() >= 2 => Prediction::backing(*last),
        _ => Prediction::PickA,
    }
}
