//! Technical indicators
//!
//! Thin warm-up-aware wrappers over the `ta` crate plus the stateful
//! per-instrument indicator engine.

pub mod engine;
pub mod rsi;
pub mod sma;

pub use engine::*;
pub use rsi::*;
pub use sma::*;

/// Indicator trait for all indicators
pub trait Indicator {
    /// Get the name of the indicator
    fn name(&self) -> &str;

    /// Update indicator with new value
    fn update(&mut self, value: f64);

    /// Get current indicator value; `None` while warming up
    fn value(&self) -> Option<f64>;

    /// Check if indicator is ready (has enough data)
    fn is_ready(&self) -> bool;
}
