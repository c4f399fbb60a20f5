//! Sample sources: where raw samples come from
//!
//! The polling loop only ever sees the [`RawSampleSource`] trait; behind it
//! sit the shared-ADC bus for the analog channels, a deterministic scripted
//! source for tests, and a simulated source for running the daemon without
//! hardware attached.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use roomsense_core::{RawSample, RawValue, SensorId, Timestamp};

use crate::SharedClock;

/// Failure to produce a raw sample for a channel
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The source does not serve this channel
    #[error("channel {} is not served by this source", .0.name())]
    UnknownChannel(SensorId),

    /// The underlying bus or driver reported a fault
    #[error("bus fault: {0}")]
    Bus(String),

    /// The channel produced nothing this cycle
    #[error("no response from channel")]
    NoResponse,
}

/// Asynchronous provider of one raw sample per channel per cycle
///
/// Implementations must be cancel-safe: the polling loop wraps every call in
/// a timeout and simply drops the future when it fires.
#[async_trait]
pub trait RawSampleSource: Send + Sync {
    /// Read one raw sample from `channel`
    async fn read(&self, channel: SensorId) -> Result<RawSample, SourceError>;
}

/// Blocking transport to the shared ADC chip
///
/// One implementation per board wiring (SPI to an MCP3008, an I²C expander,
/// a vendor HAL). `transfer` performs exactly one conversion on `adc_channel`
/// and returns the 10-bit code.
pub trait AdcTransport: Send {
    /// Run one conversion and return the raw code
    fn transfer(&mut self, adc_channel: u8) -> Result<u16, SourceError>;
}

/// The shared ADC behind a mutex
///
/// Both analog sensors hang off one converter chip that can run a single
/// conversion at a time, so concurrent reads serialize on the lock. The lock
/// is held only for the conversion itself.
pub struct AdcBus<T: AdcTransport> {
    transport: Mutex<T>,
    clock: SharedClock,
}

impl<T: AdcTransport> AdcBus<T> {
    /// Wrap a transport and a clock into a sample source
    pub fn new(transport: T, clock: SharedClock) -> Self {
        Self {
            transport: Mutex::new(transport),
            clock,
        }
    }

    /// Board wiring: which converter input a sensor channel is on
    fn adc_channel(channel: SensorId) -> Result<u8, SourceError> {
        match channel {
            SensorId::Mq135 => Ok(0),
            SensorId::Light => Ok(1),
            other => Err(SourceError::UnknownChannel(other)),
        }
    }
}

#[async_trait]
impl<T: AdcTransport> RawSampleSource for AdcBus<T> {
    async fn read(&self, channel: SensorId) -> Result<RawSample, SourceError> {
        let adc_channel = Self::adc_channel(channel)?;
        let code = {
            let mut transport = self.transport.lock().await;
            transport.transfer(adc_channel)?
        };
        Ok(RawSample {
            channel,
            value: RawValue::AdcCode(code),
            captured_at: self.clock.now(),
        })
    }
}

/// One scripted response for a channel read
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver this payload, stamped with the clock's current time
    Value(RawValue),
    /// Fail the read with this error
    Fail(SourceError),
    /// Never resolve; the polling loop's timeout has to cut the read off
    Hang,
}

/// Deterministic source for tests: each channel pops a queued [`ScriptStep`]
/// per read, and an exhausted queue answers [`SourceError::NoResponse`].
pub struct ScriptedSource {
    clock: SharedClock,
    scripts: StdMutex<HashMap<SensorId, VecDeque<ScriptStep>>>,
}

impl ScriptedSource {
    /// An empty script; every read fails until steps are pushed
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            scripts: StdMutex::new(HashMap::new()),
        }
    }

    /// Queue the next response for `channel`
    pub fn push(&self, channel: SensorId, step: ScriptStep) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(channel).or_default().push_back(step);
        }
    }

    fn pop(&self, channel: SensorId) -> Option<ScriptStep> {
        self.scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.get_mut(&channel).and_then(VecDeque::pop_front))
    }
}

#[async_trait]
impl RawSampleSource for ScriptedSource {
    async fn read(&self, channel: SensorId) -> Result<RawSample, SourceError> {
        match self.pop(channel) {
            Some(ScriptStep::Value(value)) => Ok(RawSample {
                channel,
                value,
                captured_at: self.clock.now(),
            }),
            Some(ScriptStep::Fail(err)) => Err(err),
            Some(ScriptStep::Hang) => std::future::pending().await,
            None => Err(SourceError::NoResponse),
        }
    }
}

/// Hardware-free source producing plausible wandering values
///
/// Lets the daemon run end to end on a development machine. Values follow a
/// slow random walk seeded per instance, with a small fixed offset per
/// climate sensor so the fuser has disagreement to reconcile.
pub struct SimulatedSource {
    clock: SharedClock,
    state: StdMutex<SimState>,
}

#[derive(Debug)]
struct SimState {
    rng: u64,
    temperature_c: f32,
    humidity_pct: f32,
}

impl SimulatedSource {
    /// A simulation seeded from the clock
    pub fn new(clock: SharedClock) -> Self {
        let seed = clock.now() | 1;
        Self {
            clock,
            state: StdMutex::new(SimState {
                rng: seed,
                temperature_c: 22.0,
                humidity_pct: 45.0,
            }),
        }
    }

    fn sample_value(&self, channel: SensorId) -> RawValue {
        let Ok(mut state) = self.state.lock() else {
            return RawValue::AdcCode(0);
        };

        state.temperature_c = (state.temperature_c + state.jitter(0.2)).clamp(15.0, 30.0);
        state.humidity_pct = (state.humidity_pct + state.jitter(0.8)).clamp(25.0, 70.0);

        match channel {
            SensorId::Dht22A | SensorId::Dht22B | SensorId::Dht22C => {
                // Per-sensor bias keeps the redundant group from agreeing
                // perfectly, like real units would
                let bias = (channel as u8) as f32 * 0.15;
                RawValue::Climate {
                    temperature_c: state.temperature_c + bias + state.jitter(0.1),
                    humidity_pct: state.humidity_pct + bias + state.jitter(0.4),
                }
            }
            SensorId::Mq135 => RawValue::AdcCode(sim_code(&mut state, 550, 60)),
            SensorId::Light => RawValue::AdcCode(sim_code(&mut state, 500, 120)),
        }
    }
}

fn sim_code(state: &mut SimState, center: u16, spread: u16) -> u16 {
    let offset = (state.next_u32() % (2 * spread as u32 + 1)) as i32 - spread as i32;
    (center as i32 + offset).clamp(0, 1023) as u16
}

impl SimState {
    fn next_u32(&mut self) -> u32 {
        // Knuth's MMIX linear congruential step
        self.rng = self
            .rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng >> 32) as u32
    }

    fn jitter(&mut self, span: f32) -> f32 {
        (self.next_u32() as f32 / u32::MAX as f32 - 0.5) * span
    }
}

#[async_trait]
impl RawSampleSource for SimulatedSource {
    async fn read(&self, channel: SensorId) -> Result<RawSample, SourceError> {
        let captured_at: Timestamp = self.clock.now();
        Ok(RawSample {
            channel,
            value: self.sample_value(channel),
            captured_at,
        })
    }
}
