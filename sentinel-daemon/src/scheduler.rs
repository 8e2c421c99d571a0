//! Polling scheduler
//!
//! One loop, two cadences: equities on the fast interval, option chains on
//! the slower one. The scheduler only moves samples from the source into the
//! engine; all signal logic stays in sentinel-core.

use crate::source::TickSource;
use chrono::Utc;
use sentinel_core::config::Config;
use sentinel_core::data::{Instrument, OptionRight};
use sentinel_core::engine::Engine;
use sentinel_core::error::EngineError;
use sentinel_core::options::select_strikes;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct Scheduler {
    config: Config,
    watchlist: Vec<Instrument>,
    /// Last equity price seen, for strike selection
    last_prices: HashMap<String, f64>,
}

impl Scheduler {
    pub fn new(config: Config) -> Self {
        let watchlist = config.watchlist.iter().map(Instrument::equity).collect();
        Self {
            config,
            watchlist,
            last_prices: HashMap::new(),
        }
    }

    /// Poll until the shutdown flag flips. In-flight submissions finish
    /// before this returns; the caller then shuts the engine down.
    pub async fn run(
        mut self,
        engine: &Engine,
        source: &dyn TickSource,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut stock_tick = interval(Duration::from_secs(self.config.poll_seconds));
        let mut options_tick = interval(Duration::from_secs(self.config.options_poll_seconds));
        stock_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        options_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            stocks = self.watchlist.len(),
            options = self.config.options_watchlist.len(),
            poll_secs = self.config.poll_seconds,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = stock_tick.tick() => self.poll_stocks(engine, source).await,
                _ = options_tick.tick() => self.poll_options(engine, source).await,
            }
        }
        info!("scheduler stopped");
    }

    async fn poll_stocks(&mut self, engine: &Engine, source: &dyn TickSource) {
        let samples = match source.latest(&self.watchlist).await {
            Ok(samples) => samples,
            Err(e) => {
                warn!(error = %e, "stock poll failed; retrying next cycle");
                return;
            }
        };
        for sample in samples {
            self.last_prices
                .insert(sample.instrument.symbol.clone(), sample.price);
            if let Err(e) = engine.submit(sample).await {
                warn!(error = %e, "sample submission failed");
            }
        }
    }

    async fn poll_options(&mut self, engine: &Engine, source: &dyn TickSource) {
        let as_of = Utc::now().with_timezone(&self.config.timezone).date_naive();
        for underlying in self.config.options_watchlist.clone() {
            let Some(&under_price) = self.last_prices.get(&underlying) else {
                debug!(underlying, "no underlying price yet; skipping chain");
                continue;
            };
            let chain = match source.chain(&underlying).await {
                Ok(Some(chain)) => chain,
                Ok(None) => continue,
                Err(e) => {
                    warn!(underlying, error = %e, "chain poll failed; retrying next cycle");
                    continue;
                }
            };
            let set = match select_strikes(under_price, &chain, as_of) {
                Ok(set) => set,
                Err(e @ EngineError::NoContractsAvailable { .. }) => {
                    // skip this evaluation cycle
                    warn!(underlying, error = %e, "strike selection skipped");
                    continue;
                }
                Err(e) => {
                    warn!(underlying, error = %e, "strike selection failed");
                    continue;
                }
            };

            let mut contracts = Vec::with_capacity(set.strikes().len() * 2);
            for strike in set.strikes() {
                for right in [OptionRight::Call, OptionRight::Put] {
                    contracts.push(Instrument::option(
                        underlying.clone(),
                        strike,
                        set.expiry,
                        right,
                    ));
                }
            }

            match source.latest(&contracts).await {
                Ok(samples) => {
                    for sample in samples {
                        if let Err(e) = engine.submit(sample).await {
                            warn!(error = %e, "contract sample submission failed");
                        }
                    }
                }
                Err(e) => warn!(underlying, error = %e, "contract poll failed"),
            }
        }
    }
}
