//! Sample aggregator: one environment record per polling cycle
//!
//! Runs the cycle's raw samples through calibration, groups the calibrated
//! readings by quantity, fuses each group, and assembles the record the
//! polling loop hands to the time-series store. A quantity that cannot be
//! fused degrades to an explicitly missing field; a single failed channel
//! never drops the cycle.
//!
//! The aggregator does not persist; appending the record (and observing a
//! store failure) is the polling loop's job.

use heapless::Vec;

use crate::{
    calibrate::Calibrator,
    fuse::RedundancyFuser,
    reading::{CalibratedReading, EnvironmentRecord, QuantityKind, RawSample, MAX_REDUNDANT},
    time::Timestamp,
};

/// Assembles one [`EnvironmentRecord`] per cycle from raw samples
#[derive(Debug, Clone)]
pub struct CycleAggregator {
    calibrator: Calibrator,
    fuser: RedundancyFuser,
}

impl CycleAggregator {
    /// Build an aggregator from its two stages
    pub fn new(calibrator: Calibrator, fuser: RedundancyFuser) -> Self {
        Self { calibrator, fuser }
    }

    /// The calibration stage
    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    /// Assemble the record for one cycle.
    ///
    /// `samples` holds whatever the concurrent channel reads produced;
    /// channels that timed out or failed are simply absent and their
    /// quantities end up missing. Pure: replaying the same samples yields an
    /// identical record.
    pub fn assemble(&self, cycle_start: Timestamp, samples: &[RawSample]) -> EnvironmentRecord {
        let mut buckets: [Vec<CalibratedReading, MAX_REDUNDANT>; 4] = Default::default();

        for sample in samples {
            for reading in self.calibrator.calibrate(sample, cycle_start) {
                let _ = buckets[reading.quantity.index()].push(reading);
            }
        }

        let mut record = EnvironmentRecord::empty(cycle_start);
        for quantity in QuantityKind::ALL {
            // A fusion failure leaves the field None and the remaining
            // quantities proceed: degraded, not dropped.
            if let Ok(fused) = self.fuser.fuse(quantity, &buckets[quantity.index()]) {
                record.set(fused);
            }
        }

        record
    }
}
