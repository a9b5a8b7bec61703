//! ROUNDWATCH: round-close detection and Martingale bankroll engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod signal;
pub mod sampler;
pub mod llm;
pub mod strategy;
pub mod engine;
pub mod report;
