//! Integration tests for the full calibration → fusion → aggregation path
//!
//! Exercises the pipeline the way the polling loop drives it: a batch of
//! raw samples per cycle in, one environment record out, with degraded
//! channels producing degraded records, never dropped ones.

use proptest::prelude::*;

use roomsense_core::{
    CalibratedReading, CalibrationConfig, Calibrator, Confidence, CycleAggregator, FuseError,
    FuseTolerances, QuantityKind, RawSample, RawValue, RedundancyFuser, SensorId, Validity,
};

fn aggregator() -> CycleAggregator {
    CycleAggregator::new(
        Calibrator::new(CalibrationConfig::default()),
        RedundancyFuser::new(FuseTolerances::default()),
    )
}

fn climate(channel: SensorId, temperature_c: f32, humidity_pct: f32, at: u64) -> RawSample {
    RawSample {
        channel,
        value: RawValue::Climate {
            temperature_c,
            humidity_pct,
        },
        captured_at: at,
    }
}

fn adc(channel: SensorId, code: u16, at: u64) -> RawSample {
    RawSample {
        channel,
        value: RawValue::AdcCode(code),
        captured_at: at,
    }
}

#[test]
fn healthy_station_produces_complete_records() {
    let agg = aggregator();

    let samples = [
        climate(SensorId::Dht22A, 21.9, 44.0, 2000),
        climate(SensorId::Dht22B, 22.0, 45.5, 2000),
        climate(SensorId::Dht22C, 22.3, 44.8, 2000),
        adc(SensorId::Mq135, 650, 2000),
        adc(SensorId::Light, 512, 2000),
    ];

    let record = agg.assemble(2000, &samples);
    assert!(record.is_complete());

    let temperature = record.temperature.as_ref().unwrap();
    assert_eq!(temperature.confidence, Confidence::High);
    assert!((temperature.value - (21.9 + 22.0 + 22.3) / 3.0).abs() < 1e-4);

    let humidity = record.humidity.as_ref().unwrap();
    assert_eq!(humidity.contributors.len(), 3);
}

#[test]
fn one_dead_climate_sensor_degrades_gracefully() {
    let agg = aggregator();

    // Dht22C never answered: only four samples arrive
    let samples = [
        climate(SensorId::Dht22A, 21.9, 44.0, 2000),
        climate(SensorId::Dht22B, 22.0, 45.5, 2000),
        adc(SensorId::Mq135, 650, 2000),
        adc(SensorId::Light, 512, 2000),
    ];

    let record = agg.assemble(2000, &samples);
    assert!(record.is_complete());

    let temperature = record.temperature.as_ref().unwrap();
    assert_eq!(temperature.contributors.len(), 2);
    assert_eq!(temperature.confidence, Confidence::High);
    assert!(!temperature.contributors.contains(&SensorId::Dht22C));
}

#[test]
fn disagreeing_pair_yields_low_confidence_not_a_gap() {
    let agg = aggregator();

    // Only two climate sensors answered and their temperatures are far
    // beyond tolerance of each other; fusion keeps both at low confidence
    // rather than dropping the quantity
    let samples = [
        climate(SensorId::Dht22A, 18.0, 44.0, 2000),
        climate(SensorId::Dht22B, 30.0, 45.5, 2000),
        adc(SensorId::Mq135, 650, 2000),
        adc(SensorId::Light, 512, 2000),
    ];

    let record = agg.assemble(2000, &samples);
    assert!(record.is_complete());

    let temperature = record.temperature.as_ref().unwrap();
    assert!((temperature.value - 24.0).abs() < 1e-4);
    assert_eq!(temperature.confidence, Confidence::Low);
    assert_eq!(temperature.contributors.len(), 2);

    // The humidity pair agrees and fuses normally
    let humidity = record.humidity.as_ref().unwrap();
    assert_eq!(humidity.confidence, Confidence::High);
}

#[test]
fn miscalibrated_sensor_is_outvoted() {
    let agg = aggregator();

    // Dht22B reads 9 °C hot but sane humidity: temperature trims it,
    // humidity keeps it
    let samples = [
        climate(SensorId::Dht22A, 21.8, 44.0, 2000),
        climate(SensorId::Dht22B, 31.1, 45.5, 2000),
        climate(SensorId::Dht22C, 22.1, 44.8, 2000),
        adc(SensorId::Mq135, 650, 2000),
        adc(SensorId::Light, 512, 2000),
    ];

    let record = agg.assemble(2000, &samples);

    let temperature = record.temperature.as_ref().unwrap();
    assert_eq!(temperature.confidence, Confidence::Medium);
    assert!((temperature.value - 21.95).abs() < 1e-4);
    assert!(!temperature.contributors.contains(&SensorId::Dht22B));

    let humidity = record.humidity.as_ref().unwrap();
    assert_eq!(humidity.confidence, Confidence::High);
    assert!(humidity.contributors.contains(&SensorId::Dht22B));
}

#[test]
fn stale_cycle_leaves_climate_missing() {
    let agg = aggregator();

    // Climate samples from the previous cycle (2.5 s old), analog fresh
    let samples = [
        climate(SensorId::Dht22A, 21.9, 44.0, 1500),
        climate(SensorId::Dht22B, 22.0, 45.5, 1500),
        climate(SensorId::Dht22C, 22.3, 44.8, 1500),
        adc(SensorId::Mq135, 650, 4000),
        adc(SensorId::Light, 512, 4000),
    ];

    let record = agg.assemble(4000, &samples);
    assert!(record.temperature.is_none());
    assert!(record.humidity.is_none());
    assert!(record.air_quality.is_some());
    assert!(record.light.is_some());
}

#[test]
fn invalid_adc_codes_never_become_readings() {
    let calibrator = Calibrator::new(CalibrationConfig::default());

    for code in [1024u16, 2048, u16::MAX] {
        let readings = calibrator.calibrate(&adc(SensorId::Light, code, 2000), 2000);
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].validity, Validity::OutOfRange);
    }
}

#[test]
fn fusion_error_names_the_quantity() {
    let fuser = RedundancyFuser::new(FuseTolerances::default());
    let err = fuser.fuse(QuantityKind::Humidity, &[]).unwrap_err();
    assert_eq!(
        err,
        FuseError::NoValidReading {
            quantity: QuantityKind::Humidity
        }
    );
}

proptest! {
    /// The fused value never leaves the interval spanned by its surviving
    /// contributors (a mean is bounded by its inputs).
    #[test]
    fn fused_value_is_bounded_by_inputs(
        a in -40.0f32..80.0,
        b in -40.0f32..80.0,
        c in -40.0f32..80.0,
    ) {
        let fuser = RedundancyFuser::new(FuseTolerances::default());
        let readings = [
            temp_reading(SensorId::Dht22A, a),
            temp_reading(SensorId::Dht22B, b),
            temp_reading(SensorId::Dht22C, c),
        ];

        if let Ok(fused) = fuser.fuse(QuantityKind::Temperature, &readings) {
            let lo = a.min(b).min(c);
            let hi = a.max(b).max(c);
            prop_assert!(fused.value >= lo - 1e-4);
            prop_assert!(fused.value <= hi + 1e-4);
            prop_assert!(!fused.contributors.is_empty());
        }
    }

    /// Replaying the same readings yields an identical fusion result.
    #[test]
    fn fusion_is_idempotent(
        a in -40.0f32..80.0,
        b in -40.0f32..80.0,
        c in -40.0f32..80.0,
    ) {
        let fuser = RedundancyFuser::new(FuseTolerances::default());
        let readings = [
            temp_reading(SensorId::Dht22A, a),
            temp_reading(SensorId::Dht22B, b),
            temp_reading(SensorId::Dht22C, c),
        ];

        prop_assert_eq!(
            fuser.fuse(QuantityKind::Temperature, &readings),
            fuser.fuse(QuantityKind::Temperature, &readings)
        );
    }

    /// Every 10-bit code calibrates to a finite estimate through the default
    /// light curve, and every larger code is rejected.
    #[test]
    fn adc_code_range_is_the_validity_boundary(code in 0u16..=2047) {
        let calibrator = Calibrator::new(CalibrationConfig::default());
        let readings = calibrator.calibrate(&adc(SensorId::Light, code, 2000), 2000);

        prop_assert_eq!(readings.len(), 1);
        if code <= 1023 {
            prop_assert_eq!(readings[0].validity, Validity::Valid);
            prop_assert!(readings[0].value.is_finite());
        } else {
            prop_assert_eq!(readings[0].validity, Validity::OutOfRange);
        }
    }
}

fn temp_reading(sensor_id: SensorId, value: f32) -> CalibratedReading {
    CalibratedReading {
        sensor_id,
        quantity: QuantityKind::Temperature,
        value,
        captured_at: 2000,
        validity: Validity::Valid,
    }
}
