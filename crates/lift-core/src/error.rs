//! Error types for lift

use thiserror::Error;

/// lift error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed or missing configuration, reported at load time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before any work was done
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A pipeline stage was called before the stage it depends on
    #[error("Ordering violation: {operation}() requires {requires}() to have completed")]
    OrderingViolation {
        /// Stage that was called.
        operation: &'static str,
        /// Stage that must complete first.
        requires: &'static str,
    },

    /// Numerical failure inside the causal backend
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
