//! Error handling for Myolink
//!
//! Provides error types for all layers of the daemon:
//! - Device errors (port discovery, open, read, forced reclaim)
//! - Decode errors (malformed sample lines)
//! - Configuration errors (load/validation)
//!
//! All error types use `thiserror` for ergonomic error handling.
//!
//! Device and decode failures are never fatal to the process: the
//! acquisition loop recovers from device errors with backoff and
//! re-resolution, and decode errors are skip-and-continue.

use thiserror::Error;

/// Device error type
///
/// Represents errors on the serial device side: discovery, opening,
/// reading, and forced reclaim of a busy port.
#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    /// No serial port candidate is visible on the host
    #[error("No serial device found")]
    PortNotFound,

    /// The port is held open by another process
    #[error("Port busy: {port}")]
    PortBusy {
        /// The name of the busy port.
        port: String,
    },

    /// Failed to open the port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// An open link failed mid-stream; the handle has been dropped
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// The reason the connection was lost.
        reason: String,
    },

    /// Forced reclaim of a busy port failed
    #[error("Failed to reclaim port {port}: {reason}")]
    ReclaimFailed {
        /// The port that could not be reclaimed.
        port: String,
        /// The reason the reclaim failed.
        reason: String,
    },

    /// An operation required an open link but none is held
    #[error("Device not connected")]
    NotConnected,
}

/// Decode error type
///
/// Represents a malformed line from the device. Always recovered by
/// dropping the line; never affects connection state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The line is not valid UTF-8
    #[error("Sample line is not valid UTF-8")]
    InvalidUtf8,

    /// The line is empty after trimming
    #[error("Empty sample line")]
    Empty,

    /// The line does not parse as a base-10 integer
    #[error("Invalid sample value: {text:?}")]
    InvalidSample {
        /// The trimmed line text that failed to parse.
        text: String,
    },
}

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be loaded.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// A configuration value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// The offending configuration key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main error type for Myolink
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Device error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Decode error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a device error
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device(_))
    }

    /// Check if this is a decode error
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::PortBusy {
            port: "/dev/ttyUSB0".to_string(),
        };
        assert_eq!(err.to_string(), "Port busy: /dev/ttyUSB0");

        let err = DeviceError::FailedToOpen {
            port: "/dev/ttyACM0".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open port /dev/ttyACM0: permission denied"
        );
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::InvalidSample {
            text: "12a".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid sample value: \"12a\"");
    }

    #[test]
    fn test_error_conversion() {
        let device_err = DeviceError::PortNotFound;
        let err: Error = device_err.into();
        assert!(err.is_device_error());

        let decode_err = DecodeError::Empty;
        let err: Error = decode_err.into();
        assert!(err.is_decode_error());
    }
}
