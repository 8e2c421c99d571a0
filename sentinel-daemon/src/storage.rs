//! File-backed persistence
//!
//! JSON upserts for extrema, fire records, and open positions (written via
//! tmp-then-rename so a crash never leaves a partial file), plus append-only
//! CSV journals for prices, signals, alerts, and the paper-trade ledger.

use sentinel_core::data::Instrument;
use sentinel_core::error::{EngineError, Result};
use sentinel_core::extrema::ExtremaRecord;
use sentinel_core::hygiene::FireRecord;
use sentinel_core::paper::{LedgerEntry, PaperPosition};
use sentinel_core::store::{AlertRow, PriceRow, SignalRow, Store};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const EXTREMA: &str = "extrema.json";
const FIRES: &str = "fire_records.json";
const POSITIONS: &str = "positions.json";
const TRADES: &str = "paper_trades.csv";
const PRICES: &str = "prices.csv";
const SIGNALS: &str = "signals.csv";
const ALERTS: &str = "alerts.csv";

/// Store implementation over a flat data directory.
pub struct FileStore {
    data_dir: PathBuf,
    // serializes read-modify-write cycles on the JSON files
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self {
            data_dir,
            lock: Mutex::new(()),
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn load_map<T: DeserializeOwned>(&self, name: &str, subject: &str) -> Result<HashMap<String, T>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| EngineError::Transport(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&raw).map_err(|e| EngineError::CorruptState {
            instrument: subject.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }

    fn save_map<T: Serialize>(&self, name: &str, map: &HashMap<String, T>) -> Result<()> {
        let path = self.path(name);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(map)
            .map_err(|e| EngineError::Transport(format!("encode {name}: {e}")))?;
        fs::write(&tmp, raw)
            .map_err(|e| EngineError::Transport(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| EngineError::Transport(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }

    fn upsert<T: Serialize + DeserializeOwned>(
        &self,
        name: &str,
        key: String,
        value: Option<T>,
    ) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        let mut map: HashMap<String, T> = self.load_map(name, &key)?;
        match value {
            Some(v) => {
                map.insert(key, v);
            }
            None => {
                map.remove(&key);
            }
        }
        self.save_map(name, &map)
    }

    fn append_csv<T: Serialize>(&self, name: &str, row: &T) -> Result<()> {
        let path = self.path(name);
        let fresh = !path.exists();
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EngineError::Transport(format!("open {}: {e}", path.display())))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(fresh)
            .from_writer(file);
        writer
            .serialize(row)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| EngineError::Transport(format!("append {}: {e}", path.display())))
    }
}

fn fire_key(rule_id: &str, symbol: &str) -> String {
    format!("{rule_id}|{symbol}")
}

impl Store for FileStore {
    fn load_extrema(&self, instrument: &Instrument) -> Result<Option<ExtremaRecord>> {
        let map: HashMap<String, ExtremaRecord> = self.load_map(EXTREMA, &instrument.symbol)?;
        match map.get(&instrument.symbol) {
            Some(rec) if !rec.is_valid() => Err(EngineError::CorruptState {
                instrument: instrument.symbol.clone(),
                reason: format!("extrema interval inverted: high {} < low {}", rec.high, rec.low),
            }),
            other => Ok(other.cloned()),
        }
    }

    fn save_extrema(&self, instrument: &Instrument, record: &ExtremaRecord) -> Result<()> {
        self.upsert(EXTREMA, instrument.symbol.clone(), Some(record.clone()))
    }

    fn load_fire_records(&self, instrument: &Instrument) -> Result<Vec<(String, FireRecord)>> {
        let map: HashMap<String, FireRecord> = self.load_map(FIRES, &instrument.symbol)?;
        let suffix = format!("|{}", instrument.symbol);
        Ok(map
            .into_iter()
            .filter_map(|(key, rec)| {
                key.strip_suffix(&suffix).map(|rule| (rule.to_string(), rec))
            })
            .collect())
    }

    fn save_fire_record(
        &self,
        rule_id: &str,
        instrument: &Instrument,
        record: &FireRecord,
    ) -> Result<()> {
        self.upsert(FIRES, fire_key(rule_id, &instrument.symbol), Some(*record))
    }

    fn load_open_position(&self, instrument: &Instrument) -> Result<Option<PaperPosition>> {
        let map: HashMap<String, PaperPosition> = self.load_map(POSITIONS, &instrument.symbol)?;
        Ok(map.get(&instrument.symbol).cloned())
    }

    fn save_open_position(
        &self,
        instrument: &Instrument,
        position: Option<&PaperPosition>,
    ) -> Result<()> {
        self.upsert(POSITIONS, instrument.symbol.clone(), position.cloned())
    }

    fn append_ledger(&self, entry: &LedgerEntry) -> Result<()> {
        self.append_csv(TRADES, entry)
    }

    fn record_price(&self, row: &PriceRow) -> Result<()> {
        self.append_csv(PRICES, row)
    }

    fn record_signal(&self, row: &SignalRow) -> Result<()> {
        self.append_csv(SIGNALS, row)
    }

    fn record_alert(&self, row: &AlertRow) -> Result<()> {
        self.append_csv(ALERTS, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sentinel_core::paper::PaperTrader;
    use sentinel_core::rules::{Severity, TradeAction};

    fn store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn extrema_round_trip() {
        let (_dir, store) = store();
        let nvda = Instrument::equity("NVDA");
        assert!(store.load_extrema(&nvda).unwrap().is_none());
        let rec = ExtremaRecord {
            high: 150.0,
            high_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            low: 80.0,
            low_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
        };
        store.save_extrema(&nvda, &rec).unwrap();
        assert_eq!(store.load_extrema(&nvda).unwrap(), Some(rec));
        // other instruments unaffected
        assert!(store
            .load_extrema(&Instrument::equity("AAPL"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn corrupt_json_surfaces_as_corrupt_state() {
        let (dir, store) = store();
        fs::write(dir.path().join(EXTREMA), b"{ not json").unwrap();
        let err = store.load_extrema(&Instrument::equity("NVDA")).unwrap_err();
        assert!(matches!(err, EngineError::CorruptState { .. }));
    }

    #[test]
    fn inverted_extrema_interval_is_corrupt() {
        let (_dir, store) = store();
        let nvda = Instrument::equity("NVDA");
        let rec = ExtremaRecord {
            high: 80.0,
            high_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            low: 150.0,
            low_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        store.save_extrema(&nvda, &rec).unwrap();
        assert!(matches!(
            store.load_extrema(&nvda).unwrap_err(),
            EngineError::CorruptState { .. }
        ));
    }

    #[test]
    fn fire_records_are_filtered_per_instrument() {
        let (_dir, store) = store();
        let nvda = Instrument::equity("NVDA");
        let aapl = Instrument::equity("AAPL");
        let rec = FireRecord {
            last_fired: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            price: 100.0,
            value_bucket: 10000,
        };
        store.save_fire_record("golden-cross", &nvda, &rec).unwrap();
        store.save_fire_record("pct-move-2", &nvda, &rec).unwrap();
        store.save_fire_record("golden-cross", &aapl, &rec).unwrap();

        let mut loaded = store.load_fire_records(&nvda).unwrap();
        loaded.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, "golden-cross");
        assert_eq!(loaded[1].0, "pct-move-2");
    }

    #[test]
    fn open_position_upsert_and_clear() {
        let (_dir, store) = store();
        let nvda = Instrument::equity("NVDA");
        // drive a real position through the simulator to get a realistic record
        let mut trader = PaperTrader::new(500.0, 1.0);
        let alert = sentinel_core::hygiene::ApprovedAlert {
            rule_id: "r".to_string(),
            instrument: nvda.clone(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            message: "entry".to_string(),
            severity: Severity::Info,
            value: 100.0,
            price: 100.0,
            action: TradeAction::Enter,
        };
        trader.on_alert(&alert).unwrap();
        let position = trader.open_position(&nvda).unwrap().clone();

        store.save_open_position(&nvda, Some(&position)).unwrap();
        assert_eq!(store.load_open_position(&nvda).unwrap(), Some(position));
        store.save_open_position(&nvda, None).unwrap();
        assert!(store.load_open_position(&nvda).unwrap().is_none());
    }

    #[test]
    fn journals_append_with_single_header() {
        let (dir, store) = store();
        for i in 0..3 {
            store
                .record_price(&PriceRow {
                    ts: Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap(),
                    symbol: "NVDA".to_string(),
                    price: 100.0 + i as f64,
                    volume: None,
                    source: "test".to_string(),
                })
                .unwrap();
        }
        let raw = fs::read_to_string(dir.path().join(PRICES)).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 4, "one header plus three rows");
        assert!(lines[0].contains("symbol"));
    }
}
