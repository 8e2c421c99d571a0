//! Stateful per-instrument indicator engine
//!
//! Owns a bounded rolling price window per instrument and derives SMA(20),
//! SMA(50), RSI(14) and crossover flags on each new sample. Out-of-order and
//! replayed samples are rejected before any state is touched.

use crate::data::{Instrument, Sample};
use crate::error::{EngineError, Result};
use crate::indicators::{Indicator, Rsi, Sma};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Indicator window sizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_fast: 20,
            sma_slow: 50,
            rsi_period: 14,
        }
    }
}

impl IndicatorConfig {
    /// Rolling window capacity: the largest window needed.
    pub fn window_capacity(&self) -> usize {
        self.sma_fast.max(self.sma_slow).max(self.rsi_period + 1)
    }
}

/// SMA fast/slow crossover direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Crossover {
    /// Fast SMA crossed above slow SMA
    Golden,
    /// Fast SMA crossed below slow SMA
    Death,
}

/// Indicator values derived from one sample.
///
/// Values are `None` while the corresponding window is warming up; a warming
/// indicator is reported explicitly, never as zero or a partial average.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    /// Price of the previous sample, `None` on the first sample
    pub prev_price: Option<f64>,
    pub sma_fast: Option<f64>,
    pub sma_slow: Option<f64>,
    pub rsi: Option<f64>,
    /// Set only on the sample where (fast − slow) changes sign
    pub crossover: Option<Crossover>,
}

/// Rolling indicator state for a single instrument.
///
/// Created on the first sample and kept for the process lifetime. Mutated
/// only by [`IndicatorState::update`].
#[derive(Debug)]
pub struct IndicatorState {
    config: IndicatorConfig,
    window: VecDeque<f64>,
    sma_fast: Sma,
    sma_slow: Sma,
    rsi: Rsi,
    last_timestamp: Option<DateTime<Utc>>,
    prev_price: Option<f64>,
    prev_diff: Option<f64>,
}

impl IndicatorState {
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_capacity()),
            sma_fast: Sma::new(config.sma_fast),
            sma_slow: Sma::new(config.sma_slow),
            rsi: Rsi::new(config.rsi_period),
            last_timestamp: None,
            prev_price: None,
            prev_diff: None,
            config,
        }
    }

    /// Number of samples seen so far
    pub fn len(&self) -> usize {
        self.sma_slow.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rolling price window, oldest first
    pub fn window(&self) -> &VecDeque<f64> {
        &self.window
    }

    /// Timestamp of the last accepted sample
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// Ingest one sample and derive the indicator snapshot.
    ///
    /// Rejects malformed prices and non-increasing timestamps (replays
    /// included) with [`EngineError::DataQuality`]; rejection leaves all
    /// state untouched.
    pub fn update(&mut self, sample: &Sample) -> Result<IndicatorSnapshot> {
        if !sample.is_valid() {
            return Err(EngineError::DataQuality(format!(
                "{}: malformed price {}",
                sample.instrument, sample.price
            )));
        }
        if let Some(last) = self.last_timestamp {
            if sample.timestamp <= last {
                return Err(EngineError::DataQuality(format!(
                    "{}: sample at {} is not after last seen {}",
                    sample.instrument, sample.timestamp, last
                )));
            }
        }

        let prev_price = self.prev_price;
        if self.window.len() == self.config.window_capacity() {
            self.window.pop_front();
        }
        self.window.push_back(sample.price);
        self.sma_fast.update(sample.price);
        self.sma_slow.update(sample.price);
        self.rsi.update(sample.price);

        let crossover = match (self.sma_fast.value(), self.sma_slow.value()) {
            (Some(fast), Some(slow)) => {
                let diff = fast - slow;
                let flag = match self.prev_diff {
                    Some(prev) if prev <= 0.0 && diff > 0.0 => Some(Crossover::Golden),
                    Some(prev) if prev >= 0.0 && diff < 0.0 => Some(Crossover::Death),
                    _ => None,
                };
                self.prev_diff = Some(diff);
                flag
            }
            _ => None,
        };

        self.last_timestamp = Some(sample.timestamp);
        self.prev_price = Some(sample.price);

        Ok(IndicatorSnapshot {
            timestamp: sample.timestamp,
            price: sample.price,
            prev_price,
            sma_fast: self.sma_fast.value(),
            sma_slow: self.sma_slow.value(),
            rsi: self.rsi.value(),
            crossover,
        })
    }

    /// Current SMA(fast), or an explicit warm-up error.
    pub fn sma_fast(&self) -> Result<f64> {
        self.sma_fast
            .value()
            .ok_or(EngineError::InsufficientHistory {
                indicator: "SMA(fast)",
                needed: self.config.sma_fast,
                have: self.sma_fast.count(),
            })
    }

    /// Current SMA(slow), or an explicit warm-up error.
    pub fn sma_slow(&self) -> Result<f64> {
        self.sma_slow
            .value()
            .ok_or(EngineError::InsufficientHistory {
                indicator: "SMA(slow)",
                needed: self.config.sma_slow,
                have: self.sma_slow.count(),
            })
    }
}

/// Keyed indicator store: instrument → rolling state.
///
/// State is created on the first sample for an instrument. Callers that need
/// per-instrument serialization give each instrument a single-owner task;
/// this map itself is for single-threaded use and tests.
#[derive(Debug, Default)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
    states: HashMap<Instrument, IndicatorState>,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Update the instrument's state with a new sample.
    pub fn update(&mut self, sample: &Sample) -> Result<IndicatorSnapshot> {
        self.states
            .entry(sample.instrument.clone())
            .or_insert_with(|| IndicatorState::new(self.config))
            .update(sample)
    }

    pub fn state(&self, instrument: &Instrument) -> Option<&IndicatorState> {
        self.states.get(instrument)
    }
}
