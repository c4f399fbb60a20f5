//! Data model for one polling cycle
//!
//! Every entity here is immutable once produced and lives for at most one
//! cycle, except [`EnvironmentRecord`] which is handed to the time-series
//! store and then dropped. The lifecycle is:
//!
//! ```text
//! RawSample → CalibratedReading → FusedReading → EnvironmentRecord
//! ```
//!
//! The three redundant climate sensors are a flat, uniform collection keyed
//! by [`SensorId`]; there is no sensor-subtype hierarchy.

use heapless::Vec;

use crate::time::Timestamp;

/// Maximum number of redundant sensors per quantity
pub const MAX_REDUNDANT: usize = 3;

/// Identity of one physical sensor channel
///
/// The set is fixed by the board layout: three DHT22 climate sensors on
/// GPIO, and two analog sensors behind the shared ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SensorId {
    /// First DHT22 climate sensor
    Dht22A = 0,
    /// Second DHT22 climate sensor
    Dht22B = 1,
    /// Third DHT22 climate sensor
    Dht22C = 2,
    /// MQ-135 gas sensor on ADC channel 0
    Mq135 = 3,
    /// Analog light sensor on ADC channel 1
    Light = 4,
}

impl SensorId {
    /// All five channels, in polling order
    pub const ALL: [Self; 5] = [
        Self::Dht22A,
        Self::Dht22B,
        Self::Dht22C,
        Self::Mq135,
        Self::Light,
    ];

    /// Stable human-readable name (used in logs and store payloads)
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dht22A => "dht22_a",
            Self::Dht22B => "dht22_b",
            Self::Dht22C => "dht22_c",
            Self::Mq135 => "mq135",
            Self::Light => "light",
        }
    }
}

/// Physical quantity a reading measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum QuantityKind {
    /// Air temperature (°C), three redundant sensors
    Temperature = 0,
    /// Relative humidity (%RH), three redundant sensors
    Humidity = 1,
    /// Air quality, ppm-equivalent estimate, single sensor
    AirQuality = 2,
    /// Ambient light, lux-equivalent estimate, single sensor
    Light = 3,
}

impl QuantityKind {
    /// All quantities a cycle attempts to read
    pub const ALL: [Self; 4] = [
        Self::Temperature,
        Self::Humidity,
        Self::AirQuality,
        Self::Light,
    ];

    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::AirQuality => "air_quality",
            Self::Light => "light",
        }
    }

    /// Unit of measurement
    pub const fn unit(&self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity => "%RH",
            Self::AirQuality => "ppm",
            Self::Light => "lx",
        }
    }

    /// Whether multiple redundant sensors feed this quantity
    pub const fn is_redundant(&self) -> bool {
        matches!(self, Self::Temperature | Self::Humidity)
    }

    /// Dense index for bucketing readings by quantity
    pub(crate) const fn index(&self) -> usize {
        *self as usize
    }
}

impl core::fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw payload as delivered by a channel driver
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RawValue {
    /// 10-bit code from the shared ADC, valid range 0..=1023
    AdcCode(u16),
    /// Pre-decoded DHT22 payload
    Climate {
        /// Decoded temperature (°C)
        temperature_c: f32,
        /// Decoded relative humidity (%RH)
        humidity_pct: f32,
    },
}

/// One timestamped raw scalar (or pre-decoded struct) per channel per tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawSample {
    /// Channel that produced the sample
    pub channel: SensorId,
    /// The raw payload
    pub value: RawValue,
    /// When the driver captured it
    pub captured_at: Timestamp,
}

/// Outcome of calibrating one reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Validity {
    /// Within physical range and fresh
    Valid,
    /// Malformed raw sample or value outside physical limits
    OutOfRange,
    /// Captured more than one polling interval before cycle start
    Stale,
}

/// A raw sample converted to a physical unit, with its validity mark
///
/// Invalid and stale readings still exist as values (so they can be logged
/// and inspected) but are excluded from fusion and aggregation. The `value`
/// of an uncomputable reading is NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibratedReading {
    /// Sensor the reading came from
    pub sensor_id: SensorId,
    /// Quantity measured
    pub quantity: QuantityKind,
    /// Value in the quantity's physical unit
    pub value: f32,
    /// Capture timestamp of the underlying raw sample
    pub captured_at: Timestamp,
    /// Whether the reading may enter fusion
    pub validity: Validity,
}

impl CalibratedReading {
    /// Whether this reading may contribute to fusion and aggregation
    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }
}

/// Agreement-derived confidence of a fused reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Confidence {
    /// Single contributing sensor, nothing to cross-check against
    Low,
    /// Redundant sensors disagreed; an outlier was trimmed
    Medium,
    /// All redundant sensors agreed within tolerance
    High,
}

/// One reconciled value per quantity per cycle
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FusedReading {
    /// Quantity this value estimates
    pub quantity: QuantityKind,
    /// Fused value in the quantity's unit
    pub value: f32,
    /// Sensors actually averaged into the value
    pub contributors: Vec<SensorId, MAX_REDUNDANT>,
    /// Agreement-derived confidence
    pub confidence: Confidence,
    /// Sample standard deviation of the contributing readings (0 for a
    /// single contributor); anomaly detection watches this for sensor
    /// disagreement
    pub spread: f32,
    /// Newest capture timestamp among the contributors
    pub captured_at: Timestamp,
}

impl FusedReading {
    /// Pass a single calibrated reading through as a one-contributor fused
    /// reading (fuser step 3, and the path for single-sensor quantities)
    pub fn single(reading: &CalibratedReading) -> Self {
        let mut contributors = Vec::new();
        let _ = contributors.push(reading.sensor_id);
        Self {
            quantity: reading.quantity,
            value: reading.value,
            contributors,
            confidence: Confidence::Low,
            spread: 0.0,
            captured_at: reading.captured_at,
        }
    }
}

/// The unit of persistence: one record per polling cycle
///
/// Every quantity the cycle attempted to read is either populated or
/// explicitly `None`; a cycle never silently drops a quantity. Missing
/// fields serialize as `null`, never as a fabricated zero.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvironmentRecord {
    /// Cycle start timestamp
    pub captured_at: Timestamp,
    /// Fused temperature, if any sensor produced a usable reading
    pub temperature: Option<FusedReading>,
    /// Fused humidity
    pub humidity: Option<FusedReading>,
    /// Air-quality estimate
    pub air_quality: Option<FusedReading>,
    /// Light estimate
    pub light: Option<FusedReading>,
}

impl EnvironmentRecord {
    /// A record with every field explicitly missing
    pub fn empty(captured_at: Timestamp) -> Self {
        Self {
            captured_at,
            temperature: None,
            humidity: None,
            air_quality: None,
            light: None,
        }
    }

    /// Field accessor by quantity
    pub fn get(&self, quantity: QuantityKind) -> Option<&FusedReading> {
        match quantity {
            QuantityKind::Temperature => self.temperature.as_ref(),
            QuantityKind::Humidity => self.humidity.as_ref(),
            QuantityKind::AirQuality => self.air_quality.as_ref(),
            QuantityKind::Light => self.light.as_ref(),
        }
    }

    /// Populate the field matching the reading's quantity
    pub fn set(&mut self, reading: FusedReading) {
        let slot = match reading.quantity {
            QuantityKind::Temperature => &mut self.temperature,
            QuantityKind::Humidity => &mut self.humidity,
            QuantityKind::AirQuality => &mut self.air_quality,
            QuantityKind::Light => &mut self.light,
        };
        *slot = Some(reading);
    }

    /// Whether all four quantities were fused this cycle
    pub fn is_complete(&self) -> bool {
        self.temperature.is_some()
            && self.humidity.is_some()
            && self.air_quality.is_some()
            && self.light.is_some()
    }

    /// Quantities explicitly marked missing this cycle
    pub fn missing(&self) -> Vec<QuantityKind, 4> {
        let mut out = Vec::new();
        for quantity in QuantityKind::ALL {
            if self.get(quantity).is_none() {
                let _ = out.push(quantity);
            }
        }
        out
    }
}
