use std::io;
use thiserror::Error;

/// Error type for pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A value was extracted as a type other than the one stored.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The requested type.
        expected: &'static str,
        /// The stored type, or `<empty>`.
        found: &'static str,
    },

    /// The submission was rejected because the task queue stayed full.
    #[error("Task was rejected: queue is full or pool is not running")]
    Rejected,

    /// The pool must be stopped for this operation.
    #[error("Thread pool is already running")]
    AlreadyRunning,

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error while reading a configuration file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file could not be parsed.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
