//! Calibration transform: raw samples to physical units
//!
//! Maps one [`RawSample`] to one or two [`CalibratedReading`]s (a climate
//! channel carries both temperature and humidity). Digital payloads arrive
//! pre-decoded and are only range-checked; analog codes go through the
//! shared-ADC conversion chain:
//!
//! ```text
//! code → v = code / 1023 · Vref → v_sensor = v / divider_ratio → curve → estimate
//! ```
//!
//! All constants live in [`CalibrationConfig`]: voltage reference, divider
//! ratio and curve coefficients are hardware-revision facts, not code.
//! Failures are signaled as a [`Validity`] mark on the reading, never as
//! control flow that aborts the cycle.

use heapless::Vec;

use crate::{
    constants::{
        ADC_MAX_CODE, DEFAULT_DIVIDER_RATIO, DEFAULT_POLL_INTERVAL_MS, DEFAULT_VREF_V,
        DHT22_TEMP_MAX_C, DHT22_TEMP_MIN_C, HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT,
        MQ135_CLEAN_AIR_R0_OHMS, MQ135_LOAD_OHMS, MQ135_VCC_V,
    },
    errors::CalibrationError,
    reading::{CalibratedReading, QuantityKind, RawSample, RawValue, SensorId, Validity},
    time::Timestamp,
};

/// Upper bound on polynomial curve coefficients
pub const MAX_CURVE_COEFFS: usize = 8;

/// Empirical curve mapping sensor-output volts to a physical estimate
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseCurve {
    /// Polynomial in sensor volts, `coeffs[0] + coeffs[1]·v + coeffs[2]·v² …`
    Polynomial {
        /// Coefficients, constant term first
        coeffs: Vec<f32, MAX_CURVE_COEFFS>,
    },
    /// MQ-135 style gas curve: sensor resistance from the load-resistor
    /// divider, then a piecewise ppm-equivalent mapping of the Rs/R0 ratio
    GasRatio {
        /// Sensor supply voltage (volts)
        vcc: f32,
        /// Load resistance on the sensor output (ohms)
        r_load_ohms: f32,
        /// Clean-air resistance from a calibration run (ohms)
        r0_ohms: f32,
        /// Deployment calibration factor applied to the estimate
        scale: f32,
    },
}

impl ResponseCurve {
    /// Build a polynomial curve, constant term first.
    ///
    /// Coefficients beyond [`MAX_CURVE_COEFFS`] are ignored.
    pub fn polynomial(coeffs: &[f32]) -> Self {
        let mut stored = Vec::new();
        for &c in coeffs.iter().take(MAX_CURVE_COEFFS) {
            let _ = stored.push(c);
        }
        Self::Polynomial { coeffs: stored }
    }

    /// Evaluate the curve at `volts` (sensor-output volts, divider-corrected)
    pub fn evaluate(&self, volts: f32) -> f32 {
        match self {
            Self::Polynomial { coeffs } => {
                // Horner's rule, highest-order coefficient first
                coeffs.iter().rev().fold(0.0, |acc, &c| acc * volts + c)
            }
            Self::GasRatio {
                vcc,
                r_load_ohms,
                r0_ohms,
                scale,
            } => {
                // Rs = (Vcc - Vout) · RL / Vout; a dead-short or floating
                // input yields a non-finite ratio and the caller marks the
                // reading out of range.
                let rs = (vcc - volts) * r_load_ohms / volts;
                let ratio = rs / r0_ohms;
                (gas_ratio_to_ppm(ratio) * scale).max(0.0)
            }
        }
    }
}

/// Piecewise ppm-equivalent estimate from the MQ-135 Rs/R0 ratio.
///
/// Breakpoints taken from empirical MQ-135 characteristics; the result is an
/// estimate, not a certified gas concentration.
fn gas_ratio_to_ppm(ratio: f32) -> f32 {
    if ratio < 0.5 {
        ratio * 100.0
    } else if ratio < 1.0 {
        50.0 + (ratio - 0.5) * 100.0
    } else if ratio < 2.0 {
        100.0 + (ratio - 1.0) * 200.0
    } else {
        300.0 + (ratio - 2.0) * 100.0
    }
}

/// Per-deployment calibration constants, loaded once at startup
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationConfig {
    /// ADC voltage reference (volts)
    pub vref: f32,
    /// Voltage-divider ratio between sensor output and ADC input
    pub divider_ratio: f32,
    /// Polling interval; samples older than this at cycle start are stale
    pub poll_interval_ms: u64,
    /// Curve for the MQ-135 air-quality channel
    pub air_quality_curve: ResponseCurve,
    /// Curve for the analog light channel
    pub light_curve: ResponseCurve,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            vref: DEFAULT_VREF_V,
            divider_ratio: DEFAULT_DIVIDER_RATIO,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            air_quality_curve: ResponseCurve::GasRatio {
                vcc: MQ135_VCC_V,
                r_load_ohms: MQ135_LOAD_OHMS,
                r0_ohms: MQ135_CLEAN_AIR_R0_OHMS,
                scale: 1.0,
            },
            // Linear lux-equivalent mapping: 20 at darkness, 80 at the 5 V
            // full scale of the sensor output.
            light_curve: ResponseCurve::polynomial(&[20.0, 12.0]),
        }
    }
}

/// The calibration transform
///
/// Pure and deterministic: the same sample and cycle start always produce
/// the same readings.
#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
}

impl Calibrator {
    /// Build a calibrator from deployment constants
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// The configuration this calibrator was built with
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Convert a 10-bit ADC code to divider-corrected sensor-output volts
    pub fn code_to_sensor_volts(&self, code: u16) -> Result<f32, CalibrationError> {
        if code > ADC_MAX_CODE {
            return Err(CalibrationError::InvalidRaw { code });
        }
        let v = code as f32 / ADC_MAX_CODE as f32 * self.config.vref;
        Ok(v / self.config.divider_ratio)
    }

    /// Calibrate one raw sample into zero, one, or two readings.
    ///
    /// Climate channels yield a temperature and a humidity reading; analog
    /// channels yield one. A payload that does not match its channel yields
    /// nothing and the aggregator records the quantity as missing.
    pub fn calibrate(
        &self,
        sample: &RawSample,
        cycle_start: Timestamp,
    ) -> Vec<CalibratedReading, 2> {
        let mut out = Vec::new();

        match (sample.channel, sample.value) {
            (
                SensorId::Dht22A | SensorId::Dht22B | SensorId::Dht22C,
                RawValue::Climate {
                    temperature_c,
                    humidity_pct,
                },
            ) => {
                let _ = out.push(self.climate_reading(
                    sample,
                    QuantityKind::Temperature,
                    temperature_c,
                    DHT22_TEMP_MIN_C,
                    DHT22_TEMP_MAX_C,
                    cycle_start,
                ));
                let _ = out.push(self.climate_reading(
                    sample,
                    QuantityKind::Humidity,
                    humidity_pct,
                    HUMIDITY_MIN_PCT,
                    HUMIDITY_MAX_PCT,
                    cycle_start,
                ));
            }
            (SensorId::Mq135, RawValue::AdcCode(code)) => {
                let _ = out.push(self.analog_reading(
                    sample,
                    QuantityKind::AirQuality,
                    code,
                    &self.config.air_quality_curve,
                    cycle_start,
                ));
            }
            (SensorId::Light, RawValue::AdcCode(code)) => {
                let _ = out.push(self.analog_reading(
                    sample,
                    QuantityKind::Light,
                    code,
                    &self.config.light_curve,
                    cycle_start,
                ));
            }
            _ => {
                #[cfg(feature = "log")]
                log::warn!(
                    "payload does not match channel {}, dropping sample",
                    sample.channel.name()
                );
            }
        }

        out
    }

    fn climate_reading(
        &self,
        sample: &RawSample,
        quantity: QuantityKind,
        value: f32,
        min: f32,
        max: f32,
        cycle_start: Timestamp,
    ) -> CalibratedReading {
        let validity = if !value.is_finite() || value < min || value > max {
            Validity::OutOfRange
        } else {
            validity_of(self.freshness(sample.captured_at, cycle_start))
        };

        CalibratedReading {
            sensor_id: sample.channel,
            quantity,
            value,
            captured_at: sample.captured_at,
            validity,
        }
    }

    fn analog_reading(
        &self,
        sample: &RawSample,
        quantity: QuantityKind,
        code: u16,
        curve: &ResponseCurve,
        cycle_start: Timestamp,
    ) -> CalibratedReading {
        let (value, validity) = match self.analog_estimate(code, curve) {
            Ok(estimate) => (
                estimate,
                validity_of(self.freshness(sample.captured_at, cycle_start)),
            ),
            Err(err) => (f32::NAN, validity_of(Err(err))),
        };

        CalibratedReading {
            sensor_id: sample.channel,
            quantity,
            value,
            captured_at: sample.captured_at,
            validity,
        }
    }

    fn analog_estimate(
        &self,
        code: u16,
        curve: &ResponseCurve,
    ) -> Result<f32, CalibrationError> {
        let volts = self.code_to_sensor_volts(code)?;
        let estimate = curve.evaluate(volts);
        if estimate.is_finite() {
            Ok(estimate)
        } else {
            Err(CalibrationError::NonFiniteValue)
        }
    }

    fn freshness(
        &self,
        captured_at: Timestamp,
        cycle_start: Timestamp,
    ) -> Result<(), CalibrationError> {
        let age_ms = cycle_start.saturating_sub(captured_at);
        if age_ms > self.config.poll_interval_ms {
            Err(CalibrationError::StaleCapture { age_ms })
        } else {
            Ok(())
        }
    }
}

/// The validity mark a reading carries for a given calibration outcome
fn validity_of(outcome: Result<(), CalibrationError>) -> Validity {
    match outcome {
        Ok(()) => Validity::Valid,
        Err(CalibrationError::StaleCapture { .. }) => Validity::Stale,
        Err(CalibrationError::InvalidRaw { .. } | CalibrationError::NonFiniteValue) => {
            Validity::OutOfRange
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(channel: SensorId, value: RawValue, captured_at: Timestamp) -> RawSample {
        RawSample {
            channel,
            value,
            captured_at,
        }
    }

    fn stub_calibrator(curve: ResponseCurve) -> Calibrator {
        Calibrator::new(CalibrationConfig {
            light_curve: curve,
            ..CalibrationConfig::default()
        })
    }

    #[test]
    fn adc_conversion_chain() {
        // code 512, Vref 3.3 V, divider 0.67:
        // v = 512/1023*3.3 = 1.652 V, v_sensor = 1.652/0.67 = 2.466 V
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let volts = calibrator.code_to_sensor_volts(512).unwrap();
        assert!((volts - 2.466).abs() < 1e-3);
    }

    #[test]
    fn code_above_ten_bits_is_invalid_raw() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        assert_eq!(
            calibrator.code_to_sensor_volts(1024),
            Err(CalibrationError::InvalidRaw { code: 1024 })
        );

        // And as a full sample it is marked out of range, never a reading
        let readings =
            calibrator.calibrate(&sample(SensorId::Light, RawValue::AdcCode(2000), 1000), 1000);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].validity, Validity::OutOfRange);
        assert!(readings[0].value.is_nan());
    }

    #[test]
    fn stub_curve_passes_volts_through() {
        // Identity polynomial exposes the voltage itself as the estimate
        let calibrator = stub_calibrator(ResponseCurve::polynomial(&[0.0, 1.0]));
        let readings =
            calibrator.calibrate(&sample(SensorId::Light, RawValue::AdcCode(512), 1000), 1000);
        assert_eq!(readings[0].validity, Validity::Valid);
        assert!((readings[0].value - 2.466).abs() < 1e-3);
    }

    #[test]
    fn gas_ratio_curve_at_unity_ratio() {
        let curve = ResponseCurve::GasRatio {
            vcc: 5.0,
            r_load_ohms: 10_000.0,
            r0_ohms: 10_000.0,
            scale: 1.0,
        };
        // 2.5 V across a 10k load: Rs = (5-2.5)*10000/2.5 = 10k, ratio 1.0
        assert!((curve.evaluate(2.5) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn gas_ratio_curve_zero_volts_is_out_of_range() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let readings =
            calibrator.calibrate(&sample(SensorId::Mq135, RawValue::AdcCode(0), 1000), 1000);
        assert_eq!(readings[0].validity, Validity::OutOfRange);
    }

    #[test]
    fn climate_payload_yields_two_readings() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let readings = calibrator.calibrate(
            &sample(
                SensorId::Dht22A,
                RawValue::Climate {
                    temperature_c: 22.5,
                    humidity_pct: 48.0,
                },
                1000,
            ),
            1000,
        );

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].quantity, QuantityKind::Temperature);
        assert_eq!(readings[0].value, 22.5);
        assert_eq!(readings[1].quantity, QuantityKind::Humidity);
        assert_eq!(readings[1].value, 48.0);
        assert!(readings.iter().all(|r| r.is_valid()));
    }

    #[test]
    fn climate_out_of_physical_range() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let readings = calibrator.calibrate(
            &sample(
                SensorId::Dht22B,
                RawValue::Climate {
                    temperature_c: 95.0, // above DHT22 maximum
                    humidity_pct: 104.0, // above 100 %RH
                },
                1000,
            ),
            1000,
        );

        assert!(readings.iter().all(|r| r.validity == Validity::OutOfRange));
    }

    #[test]
    fn old_capture_is_stale() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        // Default interval is 2000 ms; a sample 2500 ms old is stale
        let readings = calibrator.calibrate(
            &sample(
                SensorId::Dht22C,
                RawValue::Climate {
                    temperature_c: 21.0,
                    humidity_pct: 50.0,
                },
                1000,
            ),
            3500,
        );

        assert!(readings.iter().all(|r| r.validity == Validity::Stale));
    }

    #[test]
    fn stale_analog_sample() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let readings = calibrator.calibrate(
            &sample(SensorId::Mq135, RawValue::AdcCode(700), 1000),
            3500,
        );
        assert_eq!(readings[0].validity, Validity::Stale);
    }

    #[test]
    fn error_to_validity_mapping() {
        assert_eq!(validity_of(Ok(())), Validity::Valid);
        assert_eq!(
            validity_of(Err(CalibrationError::StaleCapture { age_ms: 2500 })),
            Validity::Stale
        );
        assert_eq!(
            validity_of(Err(CalibrationError::InvalidRaw { code: 1024 })),
            Validity::OutOfRange
        );
        assert_eq!(
            validity_of(Err(CalibrationError::NonFiniteValue)),
            Validity::OutOfRange
        );
    }

    #[test]
    fn mismatched_payload_yields_nothing() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let readings = calibrator.calibrate(
            &sample(SensorId::Dht22A, RawValue::AdcCode(512), 1000),
            1000,
        );
        assert!(readings.is_empty());
    }

    #[test]
    fn calibration_is_deterministic() {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let s = sample(SensorId::Mq135, RawValue::AdcCode(700), 1000);
        assert_eq!(calibrator.calibrate(&s, 1000), calibrator.calibrate(&s, 1000));
    }
}
