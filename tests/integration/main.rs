//! Integration tests: the full samples → history → rounds → bankroll path.

mod harness;
mod pipeline;
