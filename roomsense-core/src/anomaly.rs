//! Anomaly detection over the fused cycle output
//!
//! Two signals, both threshold checks against deployment configuration:
//!
//! - sensor disagreement: the spread of a redundant group exceeds its
//!   threshold even though fusion still produced a value
//! - sudden change: fused temperature moved further than the threshold
//!   within the last few cycles
//!
//! The detector is advisory. It never modifies records or aborts a cycle;
//! the polling loop logs what it reports and the dashboard may surface it.
//! Unlike the fuser it is stateful, carrying a short history of fused
//! temperatures across cycles.

use heapless::{Deque, Vec};

use crate::reading::{EnvironmentRecord, FusedReading, QuantityKind};

/// Cycles between the two temperatures compared for a sudden change
pub const SUDDEN_CHANGE_LAG: usize = 5;

/// Most anomalies one cycle can report
pub const MAX_ANOMALIES: usize = 3;

/// Per-quantity anomaly thresholds, deployment configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnomalyThresholds {
    /// Redundant temperature spread above this is a disagreement (°C)
    pub temperature_spread_c: f32,
    /// Redundant humidity spread above this is a disagreement (%RH)
    pub humidity_spread_pct: f32,
    /// Fused temperature moving more than this within
    /// [`SUDDEN_CHANGE_LAG`] cycles is a sudden change (°C)
    pub sudden_change_c: f32,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            temperature_spread_c: 5.0,
            humidity_spread_pct: 15.0,
            sudden_change_c: 10.0,
        }
    }
}

/// What kind of anomaly was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnomalyKind {
    /// Redundant sensors produced a value but disagree more than expected
    SensorDisagreement,
    /// The fused value moved implausibly fast
    SuddenChange,
}

/// One detected anomaly with the value that tripped the threshold
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Anomaly {
    /// Quantity the anomaly concerns
    pub quantity: QuantityKind,
    /// Classification
    pub kind: AnomalyKind,
    /// The observed spread or change
    pub value: f32,
    /// The configured threshold it exceeded
    pub threshold: f32,
}

/// Watches fused records for disagreement and sudden-change anomalies
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
    temperature_history: Deque<f32, SUDDEN_CHANGE_LAG>,
}

impl AnomalyDetector {
    /// A detector with no history yet
    pub fn new(thresholds: AnomalyThresholds) -> Self {
        Self {
            thresholds,
            temperature_history: Deque::new(),
        }
    }

    /// Examine one cycle's record and advance the history.
    ///
    /// The sudden-change check needs [`SUDDEN_CHANGE_LAG`] prior cycles
    /// with a fused temperature before it can fire; cycles with the
    /// temperature missing do not advance the history.
    pub fn observe(&mut self, record: &EnvironmentRecord) -> Vec<Anomaly, MAX_ANOMALIES> {
        let mut out: Vec<Anomaly, MAX_ANOMALIES> = Vec::new();

        if let Some(anomaly) = disagreement(
            record.temperature.as_ref(),
            self.thresholds.temperature_spread_c,
        ) {
            let _ = out.push(anomaly);
        }
        if let Some(anomaly) = disagreement(
            record.humidity.as_ref(),
            self.thresholds.humidity_spread_pct,
        ) {
            let _ = out.push(anomaly);
        }

        if let Some(temperature) = &record.temperature {
            if self.temperature_history.is_full() {
                if let Some(oldest) = self.temperature_history.front() {
                    let change = (temperature.value - oldest).abs();
                    if change > self.thresholds.sudden_change_c {
                        let _ = out.push(Anomaly {
                            quantity: QuantityKind::Temperature,
                            kind: AnomalyKind::SuddenChange,
                            value: change,
                            threshold: self.thresholds.sudden_change_c,
                        });
                    }
                }
                self.temperature_history.pop_front();
            }
            let _ = self.temperature_history.push_back(temperature.value);
        }

        out
    }
}

fn disagreement(fused: Option<&FusedReading>, threshold: f32) -> Option<Anomaly> {
    let fused = fused?;
    if fused.contributors.len() > 1 && fused.spread > threshold {
        Some(Anomaly {
            quantity: fused.quantity,
            kind: AnomalyKind::SensorDisagreement,
            value: fused.spread,
            threshold,
        })
    } else {
        None
    }
}
