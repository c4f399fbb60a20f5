//! Redundancy fuser: median-then-trim-then-average
//!
//! Reconciles the valid readings of one quantity from the redundant sensor
//! group into exactly one [`FusedReading`], or reports that fusion is
//! impossible this cycle. Median-then-trim-then-average is robust to a
//! single badly miscalibrated or failing sensor among three, the expected
//! failure mode for cheap redundant sensors, while still averaging down
//! independent noise when the sensors agree.
//!
//! The fuser is a pure function of its inputs: replaying the same readings
//! yields an identical result.

use heapless::Vec;

use crate::{
    constants::{DEFAULT_HUMIDITY_TOLERANCE_PCT, DEFAULT_TEMP_TOLERANCE_C},
    errors::FuseError,
    reading::{CalibratedReading, Confidence, FusedReading, QuantityKind, SensorId, MAX_REDUNDANT},
    time::Timestamp,
};

/// Per-quantity outlier tolerances
///
/// A reading further than the tolerance from the group median is trimmed
/// before averaging. Values are deployment configuration; the defaults are
/// illustrative and should come from the sensor datasheets.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuseTolerances {
    /// Maximum deviation from the median for temperature (°C)
    pub temperature_c: f32,
    /// Maximum deviation from the median for humidity (%RH)
    pub humidity_pct: f32,
}

impl Default for FuseTolerances {
    fn default() -> Self {
        Self {
            temperature_c: DEFAULT_TEMP_TOLERANCE_C,
            humidity_pct: DEFAULT_HUMIDITY_TOLERANCE_PCT,
        }
    }
}

/// Combines redundant calibrated readings into one fused reading per quantity
#[derive(Debug, Clone)]
pub struct RedundancyFuser {
    tolerances: FuseTolerances,
}

impl RedundancyFuser {
    /// Build a fuser with the given tolerances
    pub fn new(tolerances: FuseTolerances) -> Self {
        Self { tolerances }
    }

    /// Outlier tolerance for a quantity.
    ///
    /// Single-sensor quantities have no redundancy to referee, so their
    /// tolerance is infinite and a lone valid reading always passes through.
    pub fn tolerance(&self, quantity: QuantityKind) -> f32 {
        match quantity {
            QuantityKind::Temperature => self.tolerances.temperature_c,
            QuantityKind::Humidity => self.tolerances.humidity_pct,
            QuantityKind::AirQuality | QuantityKind::Light => f32::INFINITY,
        }
    }

    /// Fuse the cycle's readings of one quantity.
    ///
    /// Readings of other quantities and readings marked invalid or stale are
    /// ignored; at most [`MAX_REDUNDANT`] readings are considered. The
    /// algorithm:
    ///
    /// 1. zero valid readings → [`FuseError::NoValidReading`]
    /// 2. one valid reading → verbatim pass-through, confidence low
    /// 3. two or more → median, trim beyond tolerance, mean the survivors;
    ///    confidence high when nothing was trimmed, medium otherwise
    ///
    /// With exactly two readings the median is their midpoint. If both fall
    /// outside tolerance of it, neither sensor can referee the other, so
    /// nothing is trimmed: both are averaged and the result carries low
    /// confidence like any other single-source-grade estimate.
    pub fn fuse(
        &self,
        quantity: QuantityKind,
        readings: &[CalibratedReading],
    ) -> Result<FusedReading, FuseError> {
        let mut valid: Vec<&CalibratedReading, MAX_REDUNDANT> = Vec::new();
        for reading in readings {
            if reading.quantity == quantity && reading.is_valid() {
                if valid.push(reading).is_err() {
                    break;
                }
            }
        }

        match valid.len() {
            0 => Err(FuseError::NoValidReading { quantity }),
            1 => Ok(FusedReading::single(valid[0])),
            _ => self.trim_and_average(quantity, &valid),
        }
    }

    fn trim_and_average(
        &self,
        quantity: QuantityKind,
        valid: &[&CalibratedReading],
    ) -> Result<FusedReading, FuseError> {
        let median = median_value(valid);
        let tolerance = self.tolerance(quantity);

        let mut survivors: Vec<&CalibratedReading, MAX_REDUNDANT> = Vec::new();
        for reading in valid {
            if (reading.value - median).abs() > tolerance {
                #[cfg(feature = "log")]
                log::warn!(
                    "trimmed {} outlier from {}: {} deviates from median {}",
                    quantity.name(),
                    reading.sensor_id.name(),
                    reading.value,
                    median,
                );
                continue;
            }
            let _ = survivors.push(reading);
        }

        if survivors.is_empty() {
            // Exactly two readings, both beyond tolerance of their midpoint.
            // Neither can referee the other, so nothing is trimmed: both are
            // kept and the result carries single-source-grade confidence.
            #[cfg(feature = "log")]
            log::warn!(
                "{} pair disagrees beyond tolerance, fusing at low confidence",
                quantity.name(),
            );
            return Ok(fused_from(quantity, valid, Confidence::Low));
        }

        let confidence = if survivors.len() == valid.len() {
            Confidence::High
        } else {
            Confidence::Medium
        };

        Ok(fused_from(quantity, &survivors, confidence))
    }
}

/// Build the fused reading for the kept contributors.
///
/// The value is the arithmetic mean, `spread` the sample standard deviation
/// of the kept readings (0 for a single contributor), and the timestamp the
/// newest capture among them.
fn fused_from(
    quantity: QuantityKind,
    kept: &[&CalibratedReading],
    confidence: Confidence,
) -> FusedReading {
    let mut sum = 0.0;
    let mut contributors: Vec<SensorId, MAX_REDUNDANT> = Vec::new();
    let mut captured_at: Timestamp = 0;
    for reading in kept {
        sum += reading.value;
        captured_at = captured_at.max(reading.captured_at);
        let _ = contributors.push(reading.sensor_id);
    }

    let mean = sum / contributors.len() as f32;
    FusedReading {
        quantity,
        value: mean,
        contributors,
        confidence,
        spread: sample_spread(kept, mean),
        captured_at,
    }
}

/// Sample standard deviation of the kept readings around `mean`.
fn sample_spread(kept: &[&CalibratedReading], mean: f32) -> f32 {
    if kept.len() < 2 {
        return 0.0;
    }
    let variance = kept
        .iter()
        .map(|reading| {
            let deviation = reading.value - mean;
            deviation * deviation
        })
        .sum::<f32>()
        / (kept.len() - 1) as f32;
    libm::sqrtf(variance)
}

/// Median of the readings' values.
///
/// Callers guarantee at least one reading and finite values (the calibrator
/// marks non-finite values invalid before they reach fusion).
fn median_value(readings: &[&CalibratedReading]) -> f32 {
    let mut values: Vec<f32, MAX_REDUNDANT> = Vec::new();
    for reading in readings {
        let _ = values.push(reading.value);
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
