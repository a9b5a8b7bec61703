//! Core engine: round-close detection, settlement and the control loop.

pub mod accountant;
pub mod liveness;
pub mod round;
pub mod runner;

pub use round::{RoundEngine, RoundEvent};
pub use runner::Runner;
