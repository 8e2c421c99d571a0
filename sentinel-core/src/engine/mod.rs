//! The signal and alerting engine
//!
//! Each instrument gets a dedicated worker task fed by a bounded channel, so
//! sample processing for one instrument is strictly serialized while
//! different instruments run in parallel. Outbound dispatch and persistence
//! writes are handed to a separate outbox task; their failures are logged as
//! retryable and never block sample processing.

mod worker;

use crate::config::Config;
use crate::data::{Instrument, Sample};
use crate::error::{EngineError, Result};
use crate::extrema::ExtremaRecord;
use crate::hygiene::{FireRecord, QuietHours};
use crate::notify::{AlertPayload, Notifier};
use crate::paper::{LedgerEntry, PaperPosition, PaperTrader};
use crate::rules::AlertRule;
use crate::store::{AlertRow, PriceRow, SignalRow, Store};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{info, warn};
use worker::InstrumentWorker;

/// Work handed off the hot path: notifications and persistence writes.
#[derive(Debug)]
pub(crate) enum Outbound {
    Notify(AlertPayload),
    SaveExtrema {
        instrument: Instrument,
        record: ExtremaRecord,
    },
    SaveFire {
        rule_id: String,
        instrument: Instrument,
        record: FireRecord,
    },
    SavePosition {
        instrument: Instrument,
        position: Option<PaperPosition>,
    },
    AppendLedger(LedgerEntry),
    Price(PriceRow),
    Signal(SignalRow),
    Alert(AlertRow),
}

struct Intake {
    senders: HashMap<String, mpsc::Sender<Sample>>,
    workers: JoinSet<()>,
}

/// Engine handle: routes samples to per-instrument workers.
pub struct Engine {
    config: Config,
    rules: Arc<Vec<AlertRule>>,
    quiet_hours: QuietHours,
    store: Arc<dyn Store>,
    trader: Arc<Mutex<PaperTrader>>,
    outbox_tx: mpsc::UnboundedSender<Outbound>,
    outbox_task: JoinHandle<()>,
    intake: Mutex<Intake>,
}

impl Engine {
    /// Build an engine with the configured default rule set.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let rules = config.default_rules();
        Self::with_rules(config, rules, store, notifier)
    }

    /// Build an engine with an explicit rule set.
    pub fn with_rules(
        config: Config,
        rules: Vec<AlertRule>,
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let quiet_hours = config.quiet_hours_window()?;
        let trader = Arc::new(Mutex::new(PaperTrader::new(
            config.starting_equity,
            config.unit_size,
        )));
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let outbox_task = tokio::spawn(run_outbox(outbox_rx, store.clone(), notifier));
        Ok(Self {
            config,
            rules: Arc::new(rules),
            quiet_hours,
            store,
            trader,
            outbox_tx,
            outbox_task,
            intake: Mutex::new(Intake {
                senders: HashMap::new(),
                workers: JoinSet::new(),
            }),
        })
    }

    /// Route one sample to its instrument's worker, spawning the worker on
    /// first contact. Backpressure: waits when the instrument's channel is
    /// full; never reorders.
    pub async fn submit(&self, sample: Sample) -> Result<()> {
        let tx = {
            let mut intake = self.intake.lock().await;
            match intake.senders.get(&sample.instrument.symbol) {
                Some(tx) => tx.clone(),
                None => self.spawn_worker(&mut intake, sample.instrument.clone()),
            }
        };
        tx.send(sample)
            .await
            .map_err(|e| EngineError::Transport(format!("worker intake closed: {e}")))
    }

    fn spawn_worker(&self, intake: &mut Intake, instrument: Instrument) -> mpsc::Sender<Sample> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        intake.senders.insert(instrument.symbol.clone(), tx.clone());
        let store = self.store.clone();
        let rules = self.rules.clone();
        let trader = self.trader.clone();
        let outbox = self.outbox_tx.clone();
        let quiet_hours = self.quiet_hours;
        let indicators = self.config.indicators;
        let dedupe_window = self.config.dedupe_window;
        intake.workers.spawn(async move {
            // persisted state loads before the first live sample is received
            match InstrumentWorker::load(
                instrument.clone(),
                indicators,
                quiet_hours,
                dedupe_window,
                rules,
                trader,
                store,
                outbox,
            )
            .await
            {
                Ok(worker) => worker.run(rx).await,
                Err(e) => {
                    // startup halts for this instrument only; its samples are
                    // discarded so the rest of the engine keeps flowing
                    warn!(instrument = %instrument, error = %e, "worker startup refused");
                    let mut rx = rx;
                    while rx.recv().await.is_some() {}
                }
            }
        });
        tx
    }

    /// Current paper-trading equity.
    pub async fn equity(&self) -> f64 {
        self.trader.lock().await.equity()
    }

    /// Graceful shutdown: stop intake, let every worker drain its in-flight
    /// samples and persist final state, then drain the outbox.
    pub async fn shutdown(self) -> Result<()> {
        let mut intake = self.intake.into_inner();
        intake.senders.clear();
        while let Some(res) = intake.workers.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "worker task panicked");
            }
        }
        drop(self.outbox_tx);
        self.outbox_task
            .await
            .map_err(|e| EngineError::Transport(format!("outbox task failed: {e}")))?;
        info!("engine shut down cleanly");
        Ok(())
    }
}

/// Drains the outbox: persistence writes and notification dispatch. Failures
/// are logged as retryable; the engine itself never retries.
async fn run_outbox(
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
) {
    while let Some(cmd) = rx.recv().await {
        let outcome = match cmd {
            Outbound::Notify(payload) => notifier
                .send(&payload)
                .await
                .map_err(|e| EngineError::Transport(e.to_string())),
            Outbound::SaveExtrema { instrument, record } => {
                store.save_extrema(&instrument, &record)
            }
            Outbound::SaveFire {
                rule_id,
                instrument,
                record,
            } => store.save_fire_record(&rule_id, &instrument, &record),
            Outbound::SavePosition {
                instrument,
                position,
            } => store.save_open_position(&instrument, position.as_ref()),
            Outbound::AppendLedger(entry) => store.append_ledger(&entry),
            Outbound::Price(row) => store.record_price(&row),
            Outbound::Signal(row) => store.record_signal(&row),
            Outbound::Alert(row) => store.record_alert(&row),
        };
        if let Err(e) = outcome {
            warn!(error = %e, "outbox operation failed; will not block processing");
        }
    }
}
