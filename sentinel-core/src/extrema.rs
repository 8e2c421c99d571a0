//! Permanent all-time extrema tracking
//!
//! Per-instrument all-time high/low records. Both sides only ever widen;
//! reload-on-restart merges monotonically so replayed history can never
//! regress a persisted record.

use crate::data::Instrument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Persisted all-time high/low for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremaRecord {
    pub high: f64,
    pub high_at: DateTime<Utc>,
    pub low: f64,
    pub low_at: DateTime<Utc>,
}

impl ExtremaRecord {
    /// Record seeded by the first observed price: both sides start there.
    pub fn first(price: f64, at: DateTime<Utc>) -> Self {
        Self {
            high: price,
            high_at: at,
            low: price,
            low_at: at,
        }
    }

    /// A record is usable only if it describes a non-empty interval.
    pub fn is_valid(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.high >= self.low
    }

    /// Widen this record by another; keeps the outermost values of both.
    pub fn merge(&mut self, other: &ExtremaRecord) {
        if other.high > self.high {
            self.high = other.high;
            self.high_at = other.high_at;
        }
        if other.low < self.low {
            self.low = other.low;
            self.low_at = other.low_at;
        }
    }
}

/// Emitted when a price widens the stored interval.
///
/// A single price can be a new high or a new low, never both, except the
/// very first price which seeds both sides and reports a new high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtremaEvent {
    NewHigh {
        price: f64,
        at: DateTime<Utc>,
        previous: Option<f64>,
    },
    NewLow {
        price: f64,
        at: DateTime<Utc>,
        previous: Option<f64>,
    },
}

/// Keyed store of extrema records.
///
/// [`ExtremaTracker::seed`] must run before the first live update for an
/// instrument; the engine's worker startup enforces that ordering.
#[derive(Debug, Default)]
pub struct ExtremaTracker {
    records: HashMap<Instrument, ExtremaRecord>,
}

impl ExtremaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a persisted record. Merges monotonically if a record already
    /// exists, so seeding can never shrink live state.
    pub fn seed(&mut self, instrument: Instrument, record: ExtremaRecord) {
        self.records
            .entry(instrument)
            .and_modify(|r| r.merge(&record))
            .or_insert(record);
    }

    /// Observe one price; returns an event iff the interval widened.
    pub fn update(
        &mut self,
        instrument: &Instrument,
        price: f64,
        at: DateTime<Utc>,
    ) -> Option<ExtremaEvent> {
        match self.records.get_mut(instrument) {
            None => {
                self.records
                    .insert(instrument.clone(), ExtremaRecord::first(price, at));
                Some(ExtremaEvent::NewHigh {
                    price,
                    at,
                    previous: None,
                })
            }
            Some(rec) => {
                if price > rec.high {
                    let previous = Some(rec.high);
                    rec.high = price;
                    rec.high_at = at;
                    Some(ExtremaEvent::NewHigh {
                        price,
                        at,
                        previous,
                    })
                } else if price < rec.low {
                    let previous = Some(rec.low);
                    rec.low = price;
                    rec.low_at = at;
                    Some(ExtremaEvent::NewLow {
                        price,
                        at,
                        previous,
                    })
                } else {
                    None
                }
            }
        }
    }

    pub fn record(&self, instrument: &Instrument) -> Option<&ExtremaRecord> {
        self.records.get(instrument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn first_price_seeds_both_sides() {
        let mut tracker = ExtremaTracker::new();
        let nvda = Instrument::equity("NVDA");
        let event = tracker.update(&nvda, 100.0, at(0));
        assert!(matches!(event, Some(ExtremaEvent::NewHigh { .. })));
        let rec = tracker.record(&nvda).unwrap();
        assert_eq!(rec.high, 100.0);
        assert_eq!(rec.low, 100.0);
    }

    #[test]
    fn interval_only_widens() {
        let mut tracker = ExtremaTracker::new();
        let nvda = Instrument::equity("NVDA");
        let prices = [100.0, 105.0, 95.0, 102.0, 95.0, 120.0, 90.0];
        let mut high = f64::MIN;
        let mut low = f64::MAX;
        for (i, &p) in prices.iter().enumerate() {
            tracker.update(&nvda, p, at(i as i64));
            high = high.max(p);
            low = low.min(p);
            let rec = tracker.record(&nvda).unwrap();
            assert_eq!(rec.high, high);
            assert_eq!(rec.low, low);
        }
    }

    #[test]
    fn inside_price_emits_nothing() {
        let mut tracker = ExtremaTracker::new();
        let nvda = Instrument::equity("NVDA");
        tracker.update(&nvda, 100.0, at(0));
        tracker.update(&nvda, 110.0, at(1));
        tracker.update(&nvda, 90.0, at(2));
        assert_eq!(tracker.update(&nvda, 105.0, at(3)), None);
    }

    #[test]
    fn seed_then_replay_never_regresses() {
        let mut tracker = ExtremaTracker::new();
        let nvda = Instrument::equity("NVDA");
        tracker.seed(
            nvda.clone(),
            ExtremaRecord {
                high: 150.0,
                high_at: at(0),
                low: 80.0,
                low_at: at(0),
            },
        );
        // replayed history inside the persisted interval is silent
        assert_eq!(tracker.update(&nvda, 100.0, at(10)), None);
        assert_eq!(tracker.update(&nvda, 149.0, at(11)), None);
        let rec = tracker.record(&nvda).unwrap();
        assert_eq!(rec.high, 150.0);
        assert_eq!(rec.low, 80.0);
    }

    #[test]
    fn seed_after_live_merges_outward() {
        let mut tracker = ExtremaTracker::new();
        let nvda = Instrument::equity("NVDA");
        tracker.update(&nvda, 100.0, at(0));
        tracker.seed(
            nvda.clone(),
            ExtremaRecord {
                high: 90.0,
                high_at: at(0),
                low: 70.0,
                low_at: at(0),
            },
        );
        let rec = tracker.record(&nvda).unwrap();
        assert_eq!(rec.high, 100.0);
        assert_eq!(rec.low, 70.0);
    }
}
