//! Error types for configuration and process wiring
//!
//! The aggregation path itself never fails; bad input is dropped.

use common::{Interval, ParseIntervalError};
use thiserror::Error;

/// Aggregator error types
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// Interval string not recognised
    #[error(transparent)]
    InvalidInterval(#[from] ParseIntervalError),

    /// Subscribed interval cannot be built from whole base klines
    #[error("interval {interval} is not a multiple of base interval {base}")]
    NotAMultiple {
        /// Offending interval
        interval: Interval,
        /// Configured base interval
        base: Interval,
    },

    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for fallible aggregator setup
pub type AggregatorResult<T> = Result<T, AggregatorError>;
