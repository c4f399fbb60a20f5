//! Node configuration
//!
//! One JSON file per deployment carries everything operators tune: polling
//! cadence, the board's electrical constants, response curves and fusion
//! tolerances. Every field has a default, so a partial file (or none at all)
//! yields a runnable node.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use roomsense_core::{
    AnomalyThresholds, CalibrationConfig, Calibrator, CycleAggregator, FuseTolerances,
    RedundancyFuser, ResponseCurve,
};

use crate::error::NodeError;

/// Deployment configuration for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Polling cycle interval (milliseconds)
    pub poll_interval_ms: u64,
    /// Per-channel read timeout (milliseconds); clamped to the interval
    pub read_timeout_ms: u64,
    /// ADC voltage reference (volts)
    pub vref: f32,
    /// Voltage-divider ratio between sensor output and ADC input
    pub divider_ratio: f32,
    /// Response curve for the air-quality channel
    pub air_quality_curve: ResponseCurve,
    /// Response curve for the light channel
    pub light_curve: ResponseCurve,
    /// Outlier tolerances for the redundant climate sensors
    pub tolerances: FuseTolerances,
    /// Thresholds for disagreement and sudden-change anomaly detection
    pub anomaly: AnomalyThresholds,
    /// Records retained by the in-memory store
    pub memory_window: usize,
    /// When set, records are appended to this JSON-lines file instead of
    /// the in-memory window
    pub jsonl_path: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let calibration = CalibrationConfig::default();
        Self {
            poll_interval_ms: calibration.poll_interval_ms,
            read_timeout_ms: 1500,
            vref: calibration.vref,
            divider_ratio: calibration.divider_ratio,
            air_quality_curve: calibration.air_quality_curve,
            light_curve: calibration.light_curve,
            tolerances: FuseTolerances::default(),
            anomaly: AnomalyThresholds::default(),
            memory_window: 100,
            jsonl_path: None,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults; unknown fields are an
    /// error so typos in deployment files surface at startup.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The calibration stage this configuration describes
    pub fn calibration(&self) -> CalibrationConfig {
        CalibrationConfig {
            vref: self.vref,
            divider_ratio: self.divider_ratio,
            poll_interval_ms: self.poll_interval_ms,
            air_quality_curve: self.air_quality_curve.clone(),
            light_curve: self.light_curve.clone(),
        }
    }

    /// A ready-to-run aggregator built from this configuration
    pub fn aggregator(&self) -> CycleAggregator {
        CycleAggregator::new(
            Calibrator::new(self.calibration()),
            RedundancyFuser::new(self.tolerances),
        )
    }

    /// Cycle interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
