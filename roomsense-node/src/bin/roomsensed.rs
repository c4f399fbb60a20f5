//! roomsensed: the station daemon
//!
//! Loads configuration (path as the single optional argument), wires a
//! sample source to a store, and polls until Ctrl-C. Without hardware
//! configured it serves simulated samples so the full pipeline can be
//! exercised on a development machine.

use std::sync::Arc;

use log::info;

use roomsense_core::SystemClock;
use roomsense_node::{
    JsonlStore, MemoryStore, NodeConfig, NodeError, Poller, SharedClock, SimulatedSource,
    TimeSeriesStore,
};

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("loading config from {path}");
            NodeConfig::load(path)?
        }
        None => NodeConfig::default(),
    };

    let clock: SharedClock = Arc::new(SystemClock);
    let source = Arc::new(SimulatedSource::new(clock.clone()));
    info!("no hardware transport wired in this build; serving simulated samples");

    let store: Arc<dyn TimeSeriesStore> = match &config.jsonl_path {
        Some(path) => {
            info!("appending records to {}", path.display());
            Arc::new(JsonlStore::open(path).await?)
        }
        None => {
            info!(
                "keeping the last {} records in memory",
                config.memory_window
            );
            Arc::new(MemoryStore::new(config.memory_window))
        }
    };

    let poller = Poller::new(
        source,
        store.clone(),
        config.aggregator(),
        clock,
        &config,
    );
    let handle = poller.spawn();
    info!(
        "roomsensed {} polling every {} ms",
        roomsense_core::VERSION,
        config.poll_interval_ms
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down after the current cycle");
    handle.shutdown().await;

    if let Some(record) = store.latest().await? {
        info!(
            "last record at {} with {} missing quantities",
            record.captured_at,
            record.missing().len()
        );
    }
    Ok(())
}
