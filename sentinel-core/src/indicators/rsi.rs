//! RSI (Relative Strength Index) indicator

use crate::indicators::Indicator;
use ta::indicators::RelativeStrengthIndex;
use ta::Next;

/// RSI indicator wrapper.
///
/// The first value is defined after `period + 1` samples (the period counts
/// price deltas, not prices); before that the value is `None`.
#[derive(Debug)]
pub struct Rsi {
    inner: RelativeStrengthIndex,
    period: usize,
    update_count: usize,
    last_value: Option<f64>,
}

impl Rsi {
    /// Create new RSI indicator
    pub fn new(period: usize) -> Self {
        Self {
            inner: RelativeStrengthIndex::new(period).unwrap(),
            period,
            update_count: 0,
            last_value: None,
        }
    }

    /// Get RSI period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "RSI"
    }

    fn update(&mut self, value: f64) {
        let rsi_value = self.inner.next(value);
        self.update_count += 1;
        if self.update_count > self.period {
            self.last_value = Some(rsi_value);
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        // needs period+1 values: the period counts deltas
        self.update_count > self.period
    }
}
