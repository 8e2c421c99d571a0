//! Engine error taxonomy
//!
//! Nothing here is fatal to the whole process except [`EngineError::CorruptState`]
//! detected at load time, which halts startup for the affected instrument only.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced by the signal and alerting engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Out-of-order, replayed, or malformed sample. The offending sample is
    /// rejected without mutating state; the stream continues.
    #[error("data quality: {0}")]
    DataQuality(String),

    /// An indicator value was requested before its warm-up completed.
    #[error("insufficient history for {indicator}: need {needed} samples, have {have}")]
    InsufficientHistory {
        indicator: &'static str,
        needed: usize,
        have: usize,
    },

    /// The option chain had no strikes listed for the target expiry.
    #[error("no contracts available for {underlying} expiring {expiry}")]
    NoContractsAvailable {
        underlying: String,
        expiry: NaiveDate,
    },

    /// An exit alert arrived for an instrument with no open position.
    #[error("inconsistent position state: {0}")]
    InconsistentPosition(String),

    /// Dispatch or persistence failure. Always retryable from the engine's
    /// point of view; never blocks subsequent per-instrument processing.
    #[error("transport failure (retryable): {0}")]
    Transport(String),

    /// Persisted state for an instrument failed to load or validate.
    #[error("corrupt persisted state for {instrument}: {reason}")]
    CorruptState { instrument: String, reason: String },

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
