//! Staking strategy: Martingale bankroll and the local fallback pick.

pub mod bankroll;
pub mod heuristic;

pub use bankroll::{Bankroll, BankrollConfig, BankrollSummary};
pub use heuristic::fallback_pick;
