//! The polling loop: cycles, timeouts, shutdown
//!
//! One cycle per tick: issue all five channel reads concurrently, wait for
//! each to finish or time out, assemble the record, append it. A cycle is a
//! barrier; the next never starts until the current one is fully persisted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};

use roomsense_core::{AnomalyDetector, CycleAggregator, EnvironmentRecord, RawSample, SensorId};

use crate::{
    config::NodeConfig, error::NodeError, source::RawSampleSource, store::TimeSeriesStore,
    SharedClock,
};

/// Drives the read → calibrate → fuse → store pipeline on a fixed cadence
pub struct Poller {
    source: Arc<dyn RawSampleSource>,
    store: Arc<dyn TimeSeriesStore>,
    aggregator: CycleAggregator,
    detector: Mutex<AnomalyDetector>,
    clock: SharedClock,
    interval: Duration,
    read_timeout: Duration,
}

impl Poller {
    /// Assemble a poller from its collaborators and the node configuration.
    ///
    /// The per-read timeout is clamped to the cycle interval so a hung
    /// channel can never stall the cadence.
    pub fn new(
        source: Arc<dyn RawSampleSource>,
        store: Arc<dyn TimeSeriesStore>,
        aggregator: CycleAggregator,
        clock: SharedClock,
        config: &NodeConfig,
    ) -> Self {
        let interval = config.poll_interval();
        Self {
            source,
            store,
            aggregator,
            detector: Mutex::new(AnomalyDetector::new(config.anomaly)),
            clock,
            interval,
            read_timeout: config.read_timeout().min(interval),
        }
    }

    /// Run exactly one cycle: concurrent reads, one record, one append.
    ///
    /// Failed or timed-out channels are logged and their quantities left
    /// missing; only a store failure is an error here.
    pub async fn poll_once(&self) -> Result<EnvironmentRecord, NodeError> {
        let cycle_start = self.clock.now();

        let (a, b, c, gas, light) = tokio::join!(
            self.read_channel(SensorId::Dht22A),
            self.read_channel(SensorId::Dht22B),
            self.read_channel(SensorId::Dht22C),
            self.read_channel(SensorId::Mq135),
            self.read_channel(SensorId::Light),
        );

        let mut samples: Vec<RawSample> = Vec::with_capacity(SensorId::ALL.len());
        samples.extend([a, b, c, gas, light].into_iter().flatten());

        let record = self.aggregator.assemble(cycle_start, &samples);
        for quantity in record.missing() {
            warn!("cycle {cycle_start}: no usable {quantity} reading");
        }

        if let Ok(mut detector) = self.detector.lock() {
            for anomaly in detector.observe(&record) {
                warn!(
                    "cycle {cycle_start}: {:?} anomaly on {}: {:.1} exceeds threshold {:.1}",
                    anomaly.kind,
                    anomaly.quantity,
                    anomaly.value,
                    anomaly.threshold,
                );
            }
        }

        self.store.append(&record).await?;
        debug!(
            "cycle {cycle_start}: stored record ({}/4 quantities)",
            4 - record.missing().len()
        );
        Ok(record)
    }

    async fn read_channel(&self, channel: SensorId) -> Option<RawSample> {
        match timeout(self.read_timeout, self.source.read(channel)).await {
            Ok(Ok(sample)) => Some(sample),
            Ok(Err(err)) => {
                warn!("read {} failed: {err}", channel.name());
                None
            }
            Err(_) => {
                warn!(
                    "read {} timed out after {:?}",
                    channel.name(),
                    self.read_timeout
                );
                None
            }
        }
    }

    /// Run the loop on the runtime until shut down.
    ///
    /// Shutdown is observed between cycles; an in-flight cycle always
    /// finishes and is persisted before the task exits. Store failures are
    /// logged and the loop continues; one bad append must not kill the
    /// station.
    pub fn spawn(self) -> PollerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = self.poll_once().await {
                            error!("cycle failed: {err}");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("polling loop stopped");
        });

        PollerHandle { shutdown, task }
    }
}

/// Handle for stopping a spawned [`Poller`]
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Signal shutdown and wait for the loop to finish its current cycle
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
