//! Signal conditioning: raw brightness rows to confirmed round histories.

pub mod digitizer;
pub mod stability;

pub use digitizer::Digitizer;
pub use stability::StabilityWindow;
