//! Constants for the roomsense core
//!
//! Centralized numeric values used throughout the pipeline, with their source
//! (datasheet or hardware revision) where one exists. Calibration constants
//! here are *defaults* only; deployments override them through
//! [`CalibrationConfig`](crate::CalibrationConfig) so a hardware revision
//! never requires a rebuild.

/// Highest code the shared 10-bit ADC can produce (MCP3008 class).
pub const ADC_MAX_CODE: u16 = 1023;

/// Default ADC voltage reference (volts).
///
/// The MCP3008 on the reference board runs from the Pi's 3.3 V rail.
pub const DEFAULT_VREF_V: f32 = 3.3;

/// Default voltage-divider ratio scaling a 5 V sensor output to the 3.3 V
/// ADC input.
///
/// 3.3 / 5.0 rounded to the resistor pair actually fitted (2k2 / 4k7 gives
/// 0.67 within tolerance).
pub const DEFAULT_DIVIDER_RATIO: f32 = 0.67;

// ===== DHT22 CLIMATE SENSOR LIMITS =====

/// Minimum temperature the DHT22 can report (°C).
///
/// Source: Aosong DHT22/AM2302 datasheet.
pub const DHT22_TEMP_MIN_C: f32 = -40.0;

/// Maximum temperature the DHT22 can report (°C).
///
/// Source: Aosong DHT22/AM2302 datasheet.
pub const DHT22_TEMP_MAX_C: f32 = 80.0;

/// Minimum relative humidity (%RH).
pub const HUMIDITY_MIN_PCT: f32 = 0.0;

/// Maximum relative humidity (%RH).
pub const HUMIDITY_MAX_PCT: f32 = 100.0;

// ===== POLLING AND FUSION DEFAULTS =====

/// Default polling cycle interval (milliseconds).
///
/// The DHT22 needs 2 s between reads to settle, which bounds the whole
/// cycle cadence.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default outlier tolerance for redundant temperature fusion (°C).
///
/// Illustrative: roughly 3x the DHT22's ±0.5 °C accuracy plus placement
/// spread. Deployments should derive the real value from the datasheet and
/// sensor placement.
pub const DEFAULT_TEMP_TOLERANCE_C: f32 = 3.0;

/// Default outlier tolerance for redundant humidity fusion (%RH).
///
/// Illustrative, see [`DEFAULT_TEMP_TOLERANCE_C`].
pub const DEFAULT_HUMIDITY_TOLERANCE_PCT: f32 = 7.0;

// ===== MQ-135 GAS SENSOR ELECTRICAL DEFAULTS =====

/// MQ-135 heater/supply voltage (volts).
pub const MQ135_VCC_V: f32 = 5.0;

/// Load resistance on the MQ-135 output (ohms).
pub const MQ135_LOAD_OHMS: f32 = 10_000.0;

/// Placeholder clean-air resistance R0 (ohms).
///
/// The real value comes from a clean-air calibration run and is supplied
/// through configuration; this default only keeps an uncalibrated sensor
/// producing finite estimates.
pub const MQ135_CLEAN_AIR_R0_OHMS: f32 = 10_000.0;
