//! Per-instrument worker
//!
//! Single owner of one instrument's indicator state, extrema record, fire
//! records, and open position. Samples flow through the full pipeline
//! (indicators → extrema → rules → hygiene → dispatch/simulator) strictly in
//! order; nothing here awaits a network call while holding that order.

use crate::data::{Instrument, Sample};
use crate::engine::Outbound;
use crate::error::Result;
use crate::extrema::ExtremaTracker;
use crate::hygiene::{Admission, HygieneGate, QuietHours};
use crate::indicators::{IndicatorConfig, IndicatorState};
use crate::notify::AlertPayload;
use crate::paper::{PaperTrader, PositionEvent};
use crate::rules::{evaluate, AlertRule, EvalContext, TradeAction};
use crate::store::{AlertRow, PriceRow, SignalRow, Store};
use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

pub(crate) struct InstrumentWorker {
    instrument: Instrument,
    state: IndicatorState,
    extrema: ExtremaTracker,
    gate: HygieneGate,
    rules: Arc<Vec<AlertRule>>,
    trader: Arc<Mutex<PaperTrader>>,
    outbox: mpsc::UnboundedSender<Outbound>,
    tz: Tz,
    /// First price of the current local day; resets at the date rollover
    session_open: Option<f64>,
    session_date: Option<NaiveDate>,
}

impl InstrumentWorker {
    /// Load persisted state for this instrument. Runs to completion before
    /// any live sample is processed; a corrupt record refuses startup for
    /// this instrument rather than proceeding with a guessed default.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn load(
        instrument: Instrument,
        indicators: IndicatorConfig,
        quiet_hours: QuietHours,
        dedupe_window: Duration,
        rules: Arc<Vec<AlertRule>>,
        trader: Arc<Mutex<PaperTrader>>,
        store: Arc<dyn Store>,
        outbox: mpsc::UnboundedSender<Outbound>,
    ) -> Result<Self> {
        let mut extrema = ExtremaTracker::new();
        if let Some(record) = store.load_extrema(&instrument)? {
            extrema.seed(instrument.clone(), record);
        }

        let mut gate = HygieneGate::new(Some(quiet_hours), dedupe_window);
        for (rule_id, record) in store.load_fire_records(&instrument)? {
            gate.seed(rule_id, instrument.symbol.clone(), record);
        }

        if let Some(position) = store.load_open_position(&instrument)? {
            trader.lock().await.seed_position(position);
        }

        Ok(Self {
            instrument,
            state: IndicatorState::new(indicators),
            extrema,
            gate,
            rules,
            trader,
            outbox,
            tz: quiet_hours.tz,
            session_open: None,
            session_date: None,
        })
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Sample>) {
        info!(instrument = %self.instrument, "worker started");
        while let Some(sample) = rx.recv().await {
            self.process(sample).await;
        }
        self.persist_final().await;
        info!(instrument = %self.instrument, "worker drained and stopped");
    }

    async fn process(&mut self, sample: Sample) {
        let now = sample.timestamp;
        let snapshot = match self.state.update(&sample) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // reject the single sample, keep the stream alive; rejected
                // samples never reach the journals either
                warn!(instrument = %self.instrument, error = %e, "sample rejected");
                return;
            }
        };
        let _ = self.outbox.send(Outbound::Price(PriceRow {
            ts: now,
            symbol: self.instrument.symbol.clone(),
            price: sample.price,
            volume: sample.volume,
            source: "engine".to_string(),
        }));

        let local_date = now.with_timezone(&self.tz).date_naive();
        if self.session_date != Some(local_date) {
            self.session_date = Some(local_date);
            self.session_open = Some(sample.price);
        }

        let extrema_event = self
            .extrema
            .update(&self.instrument, sample.price, sample.timestamp);
        if extrema_event.is_some() {
            if let Some(record) = self.extrema.record(&self.instrument) {
                let _ = self.outbox.send(Outbound::SaveExtrema {
                    instrument: self.instrument.clone(),
                    record: record.clone(),
                });
            }
        }

        for rule in self.rules.iter() {
            let ctx = EvalContext {
                sample: &sample,
                snapshot: &snapshot,
                extrema_event: extrema_event.as_ref(),
                session_open: self.session_open,
                prior_fire: self.gate.last_fire(&rule.id, &self.instrument.symbol),
            };
            let Some(candidate) = evaluate(rule, &ctx) else {
                continue;
            };
            let _ = self.outbox.send(Outbound::Signal(SignalRow {
                ts: now,
                symbol: self.instrument.symbol.clone(),
                rule_id: rule.id.clone(),
                value: candidate.value,
                note: candidate.message.clone(),
            }));

            match self.gate.admit(candidate, now) {
                Admission::Suppressed { rule_id, reason } => {
                    debug!(instrument = %self.instrument, rule = %rule_id, ?reason, "suppressed");
                }
                Admission::Approved(approved) => {
                    if let Some(record) =
                        self.gate.last_fire(&approved.rule_id, &self.instrument.symbol)
                    {
                        let _ = self.outbox.send(Outbound::SaveFire {
                            rule_id: approved.rule_id.clone(),
                            instrument: self.instrument.clone(),
                            record: *record,
                        });
                    }
                    let _ = self.outbox.send(Outbound::Alert(AlertRow {
                        ts: now,
                        kind: format!("{:?}", self.instrument.kind).to_lowercase(),
                        subject: self.instrument.symbol.clone(),
                        message: approved.message.clone(),
                    }));
                    let _ = self
                        .outbox
                        .send(Outbound::Notify(AlertPayload::from(&approved)));

                    if approved.action != TradeAction::Hold {
                        let event = self.trader.lock().await.on_alert(&approved);
                        match event {
                            Ok(Some(PositionEvent::Opened { position, entry })) => {
                                info!(instrument = %self.instrument, price = position.entry_price, "paper entry");
                                let _ = self.outbox.send(Outbound::SavePosition {
                                    instrument: self.instrument.clone(),
                                    position: Some(position),
                                });
                                let _ = self.outbox.send(Outbound::AppendLedger(entry));
                            }
                            Ok(Some(PositionEvent::Closed {
                                realized_pnl,
                                entry,
                                ..
                            })) => {
                                info!(instrument = %self.instrument, pnl = realized_pnl, "paper exit");
                                let _ = self.outbox.send(Outbound::SavePosition {
                                    instrument: self.instrument.clone(),
                                    position: None,
                                });
                                let _ = self.outbox.send(Outbound::AppendLedger(entry));
                            }
                            Ok(Some(PositionEvent::Ignored { symbol })) => {
                                info!(instrument = %symbol, "entry ignored: position already open");
                            }
                            Ok(None) => {}
                            Err(e) => {
                                warn!(instrument = %self.instrument, error = %e, "position inconsistency");
                            }
                        }
                    }
                }
            }
        }
    }

    /// One final persistence pass after the intake closes; upserts are
    /// idempotent so this can only confirm, never corrupt.
    async fn persist_final(&mut self) {
        if let Some(record) = self.extrema.record(&self.instrument) {
            let _ = self.outbox.send(Outbound::SaveExtrema {
                instrument: self.instrument.clone(),
                record: record.clone(),
            });
        }
        for ((rule_id, _), record) in self.gate.fire_records() {
            let _ = self.outbox.send(Outbound::SaveFire {
                rule_id: rule_id.clone(),
                instrument: self.instrument.clone(),
                record: *record,
            });
        }
        let trader = self.trader.lock().await;
        let _ = self.outbox.send(Outbound::SavePosition {
            instrument: self.instrument.clone(),
            position: trader.open_position(&self.instrument).cloned(),
        });
    }
}
