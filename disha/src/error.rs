//! Error types for Disha

use crate::core::types::EchoEdge;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Disha error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GPIO error from the Raspberry Pi backend
    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Echo line did not transition within the configured timeout
    #[error("Sensor timeout: no {edge} echo edge within {waited_ms} ms")]
    SensorTimeout {
        /// Which transition was missed
        edge: EchoEdge,
        /// How long we waited for it
        waited_ms: u64,
    },

    /// Driver could not be brought up
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// External stop requested while blocked
    #[error("Cancellation requested")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Per-cycle errors the navigation loop degrades around instead of stopping
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SensorTimeout { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
