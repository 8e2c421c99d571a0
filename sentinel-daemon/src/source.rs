//! Tick sources
//!
//! The daemon pulls ordered samples through the [`TickSource`] trait. Real
//! market-data providers live behind the same interface; this module ships a
//! CSV replay source for offline runs and testing.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinel_core::data::{ChainSnapshot, Instrument, InstrumentKind, Sample};
use sentinel_core::options::next_friday;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

/// Pull interface for price samples and option chain snapshots.
#[async_trait]
pub trait TickSource: Send + Sync {
    /// Latest sample per requested instrument; instruments with nothing new
    /// this cycle are simply absent from the result.
    async fn latest(&self, instruments: &[Instrument]) -> anyhow::Result<Vec<Sample>>;

    /// Current chain snapshot for an underlying, if the source has one.
    async fn chain(&self, underlying: &str) -> anyhow::Result<Option<ChainSnapshot>>;
}

#[derive(serde::Deserialize)]
struct ReplayRow {
    ts: DateTime<Utc>,
    symbol: String,
    price: f64,
    volume: Option<f64>,
}

struct ReplayState {
    queues: HashMap<String, VecDeque<ReplayRow>>,
    last_price: HashMap<String, f64>,
}

/// Replays a recorded price CSV (ts,symbol,price,volume), one row per
/// instrument per poll. Option chains are synthesized around the last seen
/// underlying price, matching what a thin provider would list near the money.
pub struct ReplaySource {
    state: Mutex<ReplayState>,
}

impl ReplaySource {
    pub fn from_csv(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("open replay file {}", path.display()))?;
        let mut queues: HashMap<String, VecDeque<ReplayRow>> = HashMap::new();
        for row in reader.deserialize() {
            let row: ReplayRow = row.context("malformed replay row")?;
            queues.entry(row.symbol.clone()).or_default().push_back(row);
        }
        Ok(Self {
            state: Mutex::new(ReplayState {
                queues,
                last_price: HashMap::new(),
            }),
        })
    }

    /// Rough option mark for replay runs: intrinsic value plus a fixed
    /// premium. Good enough to drive contract samples through the pipeline.
    fn synthetic_mark(underlying_price: f64, instrument: &Instrument) -> Option<f64> {
        let contract = instrument.contract.as_ref()?;
        let intrinsic = match contract.right {
            sentinel_core::data::OptionRight::Call => (underlying_price - contract.strike).max(0.0),
            sentinel_core::data::OptionRight::Put => (contract.strike - underlying_price).max(0.0),
        };
        Some(intrinsic + 0.50)
    }
}

#[async_trait]
impl TickSource for ReplaySource {
    async fn latest(&self, instruments: &[Instrument]) -> anyhow::Result<Vec<Sample>> {
        let mut state = self.state.lock().unwrap();
        let mut out = Vec::new();
        for instrument in instruments {
            match instrument.kind {
                InstrumentKind::Equity => {
                    if let Some(row) = state
                        .queues
                        .get_mut(&instrument.symbol)
                        .and_then(|q| q.pop_front())
                    {
                        state.last_price.insert(instrument.symbol.clone(), row.price);
                        out.push(Sample::new(
                            instrument.clone(),
                            row.ts,
                            row.price,
                            row.volume,
                        ));
                    }
                }
                InstrumentKind::Option => {
                    let underlying = instrument.underlying().to_string();
                    if let Some(&under_price) = state.last_price.get(&underlying) {
                        if let Some(mark) = Self::synthetic_mark(under_price, instrument) {
                            out.push(Sample::new(instrument.clone(), Utc::now(), mark, None));
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    async fn chain(&self, underlying: &str) -> anyhow::Result<Option<ChainSnapshot>> {
        let state = self.state.lock().unwrap();
        let Some(&last) = state.last_price.get(underlying) else {
            return Ok(None);
        };
        let as_of = Utc::now();
        let base = last.round();
        let strikes: Vec<f64> = (-2..=2).map(|k| base + k as f64).collect();
        let mut snapshot = ChainSnapshot::new(underlying, as_of);
        // list the next few weekly expiries so any as_of date resolves
        let mut expiry = next_friday(as_of.date_naive());
        for _ in 0..3 {
            snapshot = snapshot.with_expiry(expiry, strikes.clone());
            expiry = next_friday(expiry.succ_opt().unwrap_or(expiry));
        }
        Ok(Some(snapshot))
    }
}
