//! Option chain snapshots

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point-in-time snapshot of the listed strikes for one underlying.
///
/// Delivered whole by the tick source; the strike selector never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Underlying ticker
    pub underlying: String,
    /// When the snapshot was taken
    pub as_of: DateTime<Utc>,
    /// Listed strikes per expiry, each sorted ascending
    pub expiries: BTreeMap<NaiveDate, Vec<f64>>,
}

impl ChainSnapshot {
    pub fn new(underlying: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        Self {
            underlying: underlying.into(),
            as_of,
            expiries: BTreeMap::new(),
        }
    }

    /// Add an expiry with its strikes; strikes are sorted on insert.
    pub fn with_expiry(mut self, expiry: NaiveDate, mut strikes: Vec<f64>) -> Self {
        strikes.sort_by(f64::total_cmp);
        self.expiries.insert(expiry, strikes);
        self
    }

    /// Sorted strikes listed for an expiry, if any.
    pub fn strikes_for(&self, expiry: NaiveDate) -> Option<&[f64]> {
        self.expiries.get(&expiry).map(|s| s.as_slice())
    }
}
