//! Error types for the calibration and fusion pipeline
//!
//! Per-channel failures are contained at the calibration boundary: they
//! surface as a [`Validity`](crate::reading::Validity) mark on the reading,
//! never as control flow that aborts the cycle. The enums here carry the
//! classification itself.
//!
//! Variants are kept small and `Copy`; they are produced in the per-cycle
//! hot path and may be logged or stored without allocation.

use thiserror_no_std::Error;

use crate::reading::QuantityKind;

/// Why a raw sample could not become a valid calibrated reading
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// ADC code outside the 10-bit range, or a payload that does not match
    /// the channel it arrived on
    #[error("raw code {code} outside 10-bit ADC range")]
    InvalidRaw {
        /// The offending code
        code: u16,
    },

    /// Sample captured more than one polling interval before cycle start
    #[error("sample is {age_ms}ms old, older than one polling interval")]
    StaleCapture {
        /// Age of the sample relative to cycle start, in milliseconds
        age_ms: u64,
    },

    /// Digital payload or curve output was NaN or infinite
    #[error("value is not a finite number")]
    NonFiniteValue,
}

/// Why fusion produced nothing for a quantity this cycle
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuseError {
    /// Every reading for the quantity was invalid, stale, or irreconcilable
    #[error("no valid {quantity} reading this cycle")]
    NoValidReading {
        /// The quantity that could not be fused
        quantity: QuantityKind,
    },
}
