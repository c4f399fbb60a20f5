//! Fusion and calibration core for roomsense
//!
//! Converts raw sensor samples into calibrated physical values, reconciles
//! the three redundant climate sensors into one trustworthy estimate per
//! quantity, and assembles one environment record per polling cycle.
//!
//! Key constraints:
//! - Pure, deterministic transforms (replaying a cycle yields identical output)
//! - No heap allocation in the per-cycle path
//! - Per-channel failures degrade a record field, never the whole cycle
//!
//! ```
//! use roomsense_core::{
//!     CycleAggregator, Calibrator, CalibrationConfig,
//!     RedundancyFuser, FuseTolerances,
//! };
//!
//! let aggregator = CycleAggregator::new(
//!     Calibrator::new(CalibrationConfig::default()),
//!     RedundancyFuser::new(FuseTolerances::default()),
//! );
//!
//! // One record per polling cycle, fields missing when nothing usable arrived
//! let record = aggregator.assemble(2000, &[]);
//! assert!(record.temperature.is_none());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod anomaly;
pub mod calibrate;
pub mod constants;
pub mod errors;
pub mod fuse;
pub mod reading;
pub mod time;

// Public API
pub use aggregate::CycleAggregator;
pub use anomaly::{Anomaly, AnomalyDetector, AnomalyKind, AnomalyThresholds};
pub use calibrate::{CalibrationConfig, Calibrator, ResponseCurve};
pub use errors::{CalibrationError, FuseError};
pub use fuse::{FuseTolerances, RedundancyFuser};
pub use reading::{
    CalibratedReading, Confidence, EnvironmentRecord, FusedReading, QuantityKind, RawSample,
    RawValue, SensorId, Validity,
};
#[cfg(feature = "std")]
pub use time::SystemClock;
pub use time::{FixedClock, TimeSource, Timestamp};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
