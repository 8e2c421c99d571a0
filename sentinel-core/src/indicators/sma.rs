//! SMA (Simple Moving Average) indicator

use crate::indicators::Indicator;
use ta::indicators::SimpleMovingAverage;
use ta::Next;

/// SMA indicator wrapper.
///
/// Reports `None` until a full period of samples has been seen; a partial
/// average is never exposed.
#[derive(Debug)]
pub struct Sma {
    inner: SimpleMovingAverage,
    period: usize,
    update_count: usize,
    last_value: Option<f64>,
}

impl Sma {
    /// Create new SMA indicator
    pub fn new(period: usize) -> Self {
        Self {
            inner: SimpleMovingAverage::new(period).unwrap(),
            period,
            update_count: 0,
            last_value: None,
        }
    }

    /// Get SMA period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Number of samples seen so far
    pub fn count(&self) -> usize {
        self.update_count
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "SMA"
    }

    fn update(&mut self, value: f64) {
        let sma_value = self.inner.next(value);
        self.update_count += 1;
        if self.update_count >= self.period {
            self.last_value = Some(sma_value);
        }
    }

    fn value(&self) -> Option<f64> {
        self.last_value
    }

    fn is_ready(&self) -> bool {
        self.update_count >= self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warms_up_before_reporting() {
        let mut sma = Sma::new(20);
        for i in 0..19 {
            sma.update(100.0 + i as f64);
            assert_eq!(sma.value(), None);
        }
        sma.update(119.0);
        assert!(sma.is_ready());
        assert!(sma.value().is_some());
    }

    #[test]
    fn constant_series_is_exact() {
        let mut sma = Sma::new(20);
        for _ in 0..20 {
            sma.update(100.0);
        }
        let v = sma.value().unwrap();
        assert!((v - 100.0).abs() < 1e-9);
    }
}
