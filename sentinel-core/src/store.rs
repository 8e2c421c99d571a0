//! Persistence boundary
//!
//! The engine persists extrema, fire records, open positions, the paper
//! ledger, and rolling journals through this trait. Implementations live
//! outside the core (the daemon ships a file-backed one).

use crate::data::Instrument;
use crate::error::Result;
use crate::extrema::ExtremaRecord;
use crate::hygiene::FireRecord;
use crate::paper::{LedgerEntry, PaperPosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the rolling price journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub price: f64,
    pub volume: Option<f64>,
    pub source: String,
}

/// One row of the rolling signal journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub rule_id: String,
    pub value: f64,
    pub note: String,
}

/// One row of the rolling alert journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRow {
    pub ts: DateTime<Utc>,
    pub kind: String,
    pub subject: String,
    pub message: String,
}

/// Durable storage for engine state.
///
/// Loads run once per instrument before any live update; a load failure is
/// [`crate::EngineError::CorruptState`] and halts startup for that instrument
/// only. Extrema/fire/position saves are upserts; the ledger and journals are
/// append-only.
pub trait Store: Send + Sync {
    fn load_extrema(&self, instrument: &Instrument) -> Result<Option<ExtremaRecord>>;
    fn save_extrema(&self, instrument: &Instrument, record: &ExtremaRecord) -> Result<()>;

    /// Fire records for one instrument, keyed by rule id.
    fn load_fire_records(&self, instrument: &Instrument) -> Result<Vec<(String, FireRecord)>>;
    fn save_fire_record(
        &self,
        rule_id: &str,
        instrument: &Instrument,
        record: &FireRecord,
    ) -> Result<()>;

    fn load_open_position(&self, instrument: &Instrument) -> Result<Option<PaperPosition>>;
    /// `None` clears a closed position.
    fn save_open_position(
        &self,
        instrument: &Instrument,
        position: Option<&PaperPosition>,
    ) -> Result<()>;

    fn append_ledger(&self, entry: &LedgerEntry) -> Result<()>;

    fn record_price(&self, row: &PriceRow) -> Result<()>;
    fn record_signal(&self, row: &SignalRow) -> Result<()>;
    fn record_alert(&self, row: &AlertRow) -> Result<()>;
}
