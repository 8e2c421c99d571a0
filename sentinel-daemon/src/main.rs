//! Desk sentinel daemon
//!
//! Wires the engine to file storage, a tick source, and the Discord webhook,
//! then polls until Ctrl-C. All signal logic lives in sentinel-core.

use anyhow::{Context, Result};
use sentinel_core::config::Config;
use sentinel_core::engine::Engine;
use sentinel_core::notify::Notifier;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod notifier;
mod scheduler;
mod source;
mod storage;

use notifier::{DiscordNotifier, NullNotifier};
use scheduler::Scheduler;
use source::ReplaySource;
use storage::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    info!(
        watchlist = ?config.watchlist,
        options = ?config.options_watchlist,
        "starting desk sentinel"
    );

    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let store = Arc::new(FileStore::open(&data_dir).context("opening data directory")?);

    let notifier: Arc<dyn Notifier> = match std::env::var("DISCORD_WEBHOOK_URL") {
        Ok(url) if !url.is_empty() => Arc::new(DiscordNotifier::new(url)),
        _ => {
            info!("DISCORD_WEBHOOK_URL not set; alerts go to the log only");
            Arc::new(NullNotifier)
        }
    };

    let replay_path = std::env::var("REPLAY_FILE")
        .context("REPLAY_FILE must point at a recorded price CSV (ts,symbol,price,volume)")?;
    let source = ReplaySource::from_csv(&replay_path).context("loading replay source")?;

    let engine = Engine::new(config.clone(), store, notifier).context("starting engine")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    Scheduler::new(config).run(&engine, &source, shutdown_rx).await;

    // let in-flight per-instrument work drain, then persist final state
    let equity = engine.equity().await;
    engine.shutdown().await.context("engine shutdown")?;
    info!(equity, "final paper equity");
    Ok(())
}
