//! Sentinel-Core: the signal and alerting engine behind the desk sentinel
//!
//! This crate owns everything with real state and ordering concerns:
//!
//! - **Indicator Engine**: rolling per-instrument price windows producing
//!   SMA(20), SMA(50), RSI(14) and crossover flags, via the `ta` crate
//! - **Extrema Tracker**: permanent all-time high/low per instrument
//! - **Options Strike Selector**: nearest-Friday expiry + ATM strike picking
//! - **Rule Evaluator**: pure evaluation of typed alert rules
//! - **Hygiene Gate**: quiet hours, per-rule cooldown, dedupe
//! - **Paper Trader**: simulated positions, realized P&L, equity curve
//! - **Engine**: per-instrument serialized pipeline over tokio tasks
//!
//! Transport and storage are external collaborators reached through the
//! [`notify::Notifier`] and [`store::Store`] traits; the engine never does
//! network or filesystem I/O itself.
//!
//! # Example
//!
//! ```no_run
//! use sentinel_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let engine = Engine::new(config, store, notifier)?;
//! engine.submit(Sample::equity("NVDA", chrono::Utc::now(), 181.25, None)).await?;
//! engine.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod extrema;
pub mod hygiene;
pub mod indicators;
pub mod notify;
pub mod options;
pub mod paper;
pub mod rules;
pub mod store;

// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::data::*;
    pub use crate::engine::Engine;
    pub use crate::error::{EngineError, Result};
    pub use crate::extrema::{ExtremaEvent, ExtremaRecord, ExtremaTracker};
    pub use crate::hygiene::{Admission, ApprovedAlert, FireRecord, HygieneGate, QuietHours};
    pub use crate::indicators::{Crossover, Indicator, IndicatorEngine, IndicatorSnapshot};
    pub use crate::notify::{AlertPayload, Notifier, NotifyError};
    pub use crate::options::{select_strikes, OptionStrikeSet};
    pub use crate::paper::{PaperPosition, PaperTrader, PositionEvent};
    pub use crate::rules::{AlertRule, CandidateAlert, RuleCondition};
    pub use crate::store::Store;
}

pub use error::{EngineError, Result};
