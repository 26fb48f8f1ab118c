//! Common error types for roboarm.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use thiserror::Error;

/// Main error type for roboarm operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from tokio or std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// No USB serial bridge with the requested serial number is attached.
    #[error("Robo arm is not connected (no USB serial device with serial number {serial_number})")]
    DeviceNotFound { serial_number: String },

    /// The driver timeout expired during a read or write.
    #[error("Serial link timed out")]
    Timeout,

    /// A command argument is outside the range the device accepts.
    #[error("Incorrect {argument} {value}. Allowed values are <{min} - {max}>.")]
    OutOfRange {
        argument: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The device echo did not match what the command expects.
    #[error("Unexpected response to {command}: {received:?}")]
    UnexpectedResponse { command: String, received: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
