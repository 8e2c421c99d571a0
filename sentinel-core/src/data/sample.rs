//! Price samples

use crate::data::Instrument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamped price/quote sample for one instrument.
///
/// Timestamps must be strictly increasing per instrument; an out-of-order or
/// replayed sample is a data-quality error and is rejected without mutating
/// any state. No ordering is required across instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub instrument: Instrument,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: Option<f64>,
}

impl Sample {
    pub fn new(
        instrument: Instrument,
        timestamp: DateTime<Utc>,
        price: f64,
        volume: Option<f64>,
    ) -> Self {
        Self {
            instrument,
            timestamp,
            price,
            volume,
        }
    }

    /// Shorthand for an equity sample
    pub fn equity(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: f64,
        volume: Option<f64>,
    ) -> Self {
        Self::new(Instrument::equity(symbol), timestamp, price, volume)
    }

    /// A sample is malformed if its price is non-finite or non-positive.
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}
