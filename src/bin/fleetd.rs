use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use sensor_monitoring::{
    Reading,
    actors::orchestrator::OrchestratorHandle,
    config::{Config, StoreConfig, read_config_file},
    store::{ConfigStore, memory::MemoryStore},
    util,
};
use tokio::spawn;
use tokio::sync::broadcast;
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (falls back to $FLEET_CONFIG, then ./fleet.json)
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("sensor_monitoring", LevelFilter::TRACE),
        ("fleetd", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let path = args.file.unwrap_or_else(util::get_config_path);
    let config = read_config_file(&path)?;

    let store = build_store(&config).await?;

    // env beats file for the intervals that operators tweak most
    let mut poll = config.poll.clone();
    poll.poll_interval_secs = util::get_poll_interval(poll.poll_interval_secs);
    poll.refresh_interval_secs = util::get_refresh_interval(poll.refresh_interval_secs);

    let (reading_tx, reading_rx) = broadcast::channel(256);
    spawn(reading_sink(reading_rx));

    let orchestrator = OrchestratorHandle::spawn(store, poll.tunables(), reading_tx);
    info!("fleet monitoring started");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    orchestrator.shutdown().await;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ConfigStore>> {
    match config.store.clone().unwrap_or_default() {
        StoreConfig::None => {
            warn!("no configuration store configured; starting with an empty fleet");
            Ok(Arc::new(MemoryStore::new()))
        }

        #[cfg(feature = "store-sqlite")]
        StoreConfig::Sqlite { path } => {
            let store = sensor_monitoring::store::sqlite::SqliteStore::new(path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "store-sqlite"))]
        StoreConfig::Sqlite { .. } => {
            anyhow::bail!("built without sqlite support; enable the `store-sqlite` feature")
        }
    }
}

/// Result sink: one JSON line per reading on stdout. Strictly
/// fire-and-forget from the pollers' perspective - if this consumer
/// lags, readings are skipped, never buffered back into the core.
async fn reading_sink(mut reading_rx: broadcast::Receiver<Reading>) {
    loop {
        match reading_rx.recv().await {
            Ok(reading) => match serde_json::to_string(&reading) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("failed to encode reading: {e}"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("reading sink lagged, skipped {skipped} readings");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
