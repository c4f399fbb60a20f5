//! Node runtime for roomsense
//!
//! Hosts the async half of the station: sample sources behind the shared-ADC
//! mutex, the fixed-cadence polling loop with per-read timeouts, and the
//! time-series stores that persist one [`roomsense_core::EnvironmentRecord`]
//! per cycle. The pure calibration/fusion pipeline lives in
//! [`roomsense_core`]; this crate only schedules it and moves its inputs and
//! outputs around.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod poller;
pub mod source;
pub mod store;

pub use config::NodeConfig;
pub use error::NodeError;
pub use poller::{Poller, PollerHandle};
pub use source::{AdcBus, AdcTransport, RawSampleSource, ScriptStep, ScriptedSource, SimulatedSource, SourceError};
pub use store::{JsonlStore, MemoryStore, StoreError, TimeSeriesStore};

use std::sync::Arc;

use roomsense_core::TimeSource;

/// Clock handle shared between the poller and its sources
pub type SharedClock = Arc<dyn TimeSource + Send + Sync>;
