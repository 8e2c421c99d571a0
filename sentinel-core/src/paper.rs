//! Paper trading simulator
//!
//! Consumes approved entry/exit alerts, keeps at most one open position per
//! instrument, and appends realized P&L to a monotonic equity ledger.

use crate::data::Instrument;
use crate::error::{EngineError, Result};
use crate::hygiene::ApprovedAlert;
use crate::rules::TradeAction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Open/closed status of a simulated position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A simulated position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperPosition {
    pub instrument: Instrument,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub size: f64,
    pub status: PositionStatus,
    pub exit_price: Option<f64>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl PaperPosition {
    fn open(instrument: Instrument, entry_price: f64, entry_time: DateTime<Utc>, size: f64) -> Self {
        Self {
            instrument,
            entry_price,
            entry_time,
            size,
            status: PositionStatus::Open,
            exit_price: None,
            exit_time: None,
        }
    }
}

/// Trade side of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One row of the append-only paper-trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub symbol: String,
    pub side: TradeSide,
    pub qty: f64,
    pub price: f64,
    /// Set on closing entries only
    pub realized_pnl: Option<f64>,
    /// Running equity after this entry
    pub equity_after: f64,
}

/// Outcome of feeding one approved alert to the simulator.
#[derive(Debug, Clone)]
pub enum PositionEvent {
    Opened {
        position: PaperPosition,
        entry: LedgerEntry,
    },
    Closed {
        position: PaperPosition,
        realized_pnl: f64,
        entry: LedgerEntry,
    },
    /// Entry alert while a position is already open: reported, not stacked.
    Ignored { symbol: String },
}

/// Paper trading simulator.
///
/// Positions are sized by a fixed configured unit; one open position per
/// instrument. The ledger is append-only and never rewritten.
#[derive(Debug)]
pub struct PaperTrader {
    unit_size: f64,
    equity: f64,
    positions: HashMap<Instrument, PaperPosition>,
    ledger: Vec<LedgerEntry>,
}

impl PaperTrader {
    pub fn new(starting_equity: f64, unit_size: f64) -> Self {
        Self {
            unit_size,
            equity: starting_equity,
            positions: HashMap::new(),
            ledger: Vec::new(),
        }
    }

    /// Reinstall a persisted open position before live traffic.
    pub fn seed_position(&mut self, position: PaperPosition) {
        self.positions.insert(position.instrument.clone(), position);
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn open_position(&self, instrument: &Instrument) -> Option<&PaperPosition> {
        self.positions.get(instrument)
    }

    pub fn ledger(&self) -> &[LedgerEntry] {
        &self.ledger
    }

    /// Feed one approved alert through the simulator.
    ///
    /// `TradeAction::Hold` alerts are ignored. Exit without an open position
    /// is an [`EngineError::InconsistentPosition`]; no synthetic close is
    /// created.
    pub fn on_alert(&mut self, alert: &ApprovedAlert) -> Result<Option<PositionEvent>> {
        match alert.action {
            TradeAction::Hold => Ok(None),
            TradeAction::Enter => {
                if self.positions.contains_key(&alert.instrument) {
                    return Ok(Some(PositionEvent::Ignored {
                        symbol: alert.instrument.symbol.clone(),
                    }));
                }
                let position = PaperPosition::open(
                    alert.instrument.clone(),
                    alert.price,
                    alert.timestamp,
                    self.unit_size,
                );
                let entry = self.append(
                    alert.timestamp,
                    &alert.instrument,
                    TradeSide::Buy,
                    alert.price,
                    None,
                );
                self.positions
                    .insert(alert.instrument.clone(), position.clone());
                Ok(Some(PositionEvent::Opened { position, entry }))
            }
            TradeAction::Exit => {
                let mut position = self.positions.remove(&alert.instrument).ok_or_else(|| {
                    EngineError::InconsistentPosition(format!(
                        "exit alert for {} with no open position",
                        alert.instrument
                    ))
                })?;
                let realized_pnl = (alert.price - position.entry_price) * position.size;
                position.status = PositionStatus::Closed;
                position.exit_price = Some(alert.price);
                position.exit_time = Some(alert.timestamp);
                self.equity += realized_pnl;
                let entry = self.append(
                    alert.timestamp,
                    &alert.instrument,
                    TradeSide::Sell,
                    alert.price,
                    Some(realized_pnl),
                );
                Ok(Some(PositionEvent::Closed {
                    position,
                    realized_pnl,
                    entry,
                }))
            }
        }
    }

    fn append(
        &mut self,
        at: DateTime<Utc>,
        instrument: &Instrument,
        side: TradeSide,
        price: f64,
        realized_pnl: Option<f64>,
    ) -> LedgerEntry {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            at,
            symbol: instrument.symbol.clone(),
            side,
            qty: self.unit_size,
            price,
            realized_pnl,
            equity_after: self.equity,
        };
        self.ledger.push(entry.clone());
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Severity;
    use chrono::TimeZone;

    fn alert(action: TradeAction, price: f64, secs: i64) -> ApprovedAlert {
        ApprovedAlert {
            rule_id: "r".to_string(),
            instrument: Instrument::equity("NVDA"),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            message: "test".to_string(),
            severity: Severity::Info,
            value: price,
            price,
            action,
        }
    }

    #[test]
    fn entry_opens_one_position() {
        let mut trader = PaperTrader::new(500.0, 1.0);
        let event = trader.on_alert(&alert(TradeAction::Enter, 100.0, 0)).unwrap();
        assert!(matches!(event, Some(PositionEvent::Opened { .. })));
        let pos = trader.open_position(&Instrument::equity("NVDA")).unwrap();
        assert_eq!(pos.entry_price, 100.0);
        assert_eq!(pos.status, PositionStatus::Open);
    }

    #[test]
    fn second_entry_is_a_reported_noop() {
        let mut trader = PaperTrader::new(500.0, 1.0);
        trader.on_alert(&alert(TradeAction::Enter, 100.0, 0)).unwrap();
        let event = trader.on_alert(&alert(TradeAction::Enter, 105.0, 1)).unwrap();
        assert!(matches!(event, Some(PositionEvent::Ignored { .. })));
        // the original entry is untouched
        let pos = trader.open_position(&Instrument::equity("NVDA")).unwrap();
        assert_eq!(pos.entry_price, 100.0);
        assert_eq!(trader.ledger().len(), 1);
    }

    #[test]
    fn exit_closes_and_records_exact_pnl() {
        let mut trader = PaperTrader::new(500.0, 2.0);
        trader.on_alert(&alert(TradeAction::Enter, 100.0, 0)).unwrap();
        let event = trader.on_alert(&alert(TradeAction::Exit, 110.0, 60)).unwrap();
        match event {
            Some(PositionEvent::Closed {
                position,
                realized_pnl,
                entry,
            }) => {
                assert_eq!(realized_pnl, (110.0 - 100.0) * 2.0);
                assert_eq!(position.status, PositionStatus::Closed);
                assert_eq!(position.exit_price, Some(110.0));
                assert_eq!(entry.realized_pnl, Some(20.0));
                assert_eq!(entry.equity_after, 520.0);
            }
            other => panic!("expected close, got {other:?}"),
        }
        assert_eq!(trader.equity(), 520.0);
        assert!(trader.open_position(&Instrument::equity("NVDA")).is_none());
    }

    #[test]
    fn exit_without_position_fails_loudly() {
        let mut trader = PaperTrader::new(500.0, 1.0);
        let err = trader
            .on_alert(&alert(TradeAction::Exit, 110.0, 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::InconsistentPosition(_)));
        assert!(trader.ledger().is_empty());
    }

    #[test]
    fn hold_alerts_do_nothing() {
        let mut trader = PaperTrader::new(500.0, 1.0);
        assert!(trader
            .on_alert(&alert(TradeAction::Hold, 100.0, 0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn ledger_is_append_only_across_round_trips() {
        let mut trader = PaperTrader::new(500.0, 1.0);
        trader.on_alert(&alert(TradeAction::Enter, 100.0, 0)).unwrap();
        trader.on_alert(&alert(TradeAction::Exit, 90.0, 1)).unwrap();
        trader.on_alert(&alert(TradeAction::Enter, 90.0, 2)).unwrap();
        trader.on_alert(&alert(TradeAction::Exit, 95.0, 3)).unwrap();
        let ledger = trader.ledger();
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger[1].realized_pnl, Some(-10.0));
        assert_eq!(ledger[3].realized_pnl, Some(5.0));
        assert_eq!(trader.equity(), 500.0 - 10.0 + 5.0);
        // equity_after never rewritten: the earlier rows still show history
        assert_eq!(ledger[1].equity_after, 490.0);
    }

    #[test]
    fn seeded_position_blocks_new_entries() {
        let mut trader = PaperTrader::new(500.0, 1.0);
        trader.seed_position(PaperPosition::open(
            Instrument::equity("NVDA"),
            95.0,
            Utc.timestamp_opt(1_699_999_000, 0).unwrap(),
            1.0,
        ));
        let event = trader.on_alert(&alert(TradeAction::Enter, 100.0, 0)).unwrap();
        assert!(matches!(event, Some(PositionEvent::Ignored { .. })));
    }
}
