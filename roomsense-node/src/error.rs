//! Node-level error type
//!
//! Everything the polling loop or the daemon can fail on converges here, so
//! `main` and the loop body handle one type with `?`.

use thiserror::Error;

use crate::{source::SourceError, store::StoreError};

/// Top-level error for the node runtime
#[derive(Debug, Error)]
pub enum NodeError {
    /// A sample source failed outright (distinct from a timed-out read,
    /// which only degrades the cycle)
    #[error("sample source: {0}")]
    Source(#[from] SourceError),

    /// The time-series store rejected or failed an operation
    #[error("time-series store: {0}")]
    Store(#[from] StoreError),

    /// Filesystem or signal-handling I/O failure
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration file
    #[error("config parse: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
