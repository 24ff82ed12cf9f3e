//! # Error Types
//!
//! Custom error types for Pedal Relay using `thiserror`.
//!
//! Per-event faults ([`DecodeError`], [`WriteError`]) are absorbed inside the
//! relay loop. Resource faults ([`CreationError`], [`SourceUnavailable`]) are
//! surfaced once to the caller of `Relay::start`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Pedal Relay
#[derive(Debug, Error)]
pub enum PedalRelayError {
    /// Virtual device could not be allocated
    #[error(transparent)]
    Creation(#[from] CreationError),

    /// A source joystick node could not be opened
    #[error(transparent)]
    SourceUnavailable(#[from] SourceUnavailable),

    /// Invalid calibration access
    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Preset document errors
    #[error("Preset error: {0}")]
    Preset(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A joystick frame could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer than 8 bytes were available; not a stream fault
    #[error("short read: {len} of 8 bytes")]
    ShortRead { len: usize },
}

/// The host input subsystem refused to allocate the virtual device
#[derive(Debug, Error)]
#[error("Failed to create virtual device '{name}': {source}")]
pub struct CreationError {
    pub name: String,
    #[source]
    pub source: std::io::Error,
}

/// An event could not be written to the virtual device
#[derive(Debug, Error)]
pub enum WriteError {
    /// The device was already closed
    #[error("virtual device is closed")]
    Closed,

    /// The kernel rejected the write (e.g. device revoked)
    #[error("Failed to emit event: {0}")]
    Io(#[source] std::io::Error),
}

/// A source joystick node could not be opened
#[derive(Debug, Error)]
#[error("Source device {} unavailable: {source}", path.display())]
pub struct SourceUnavailable {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Errors from the calibrator's string/typed setting surface
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("unknown pedal '{0}' (expected gas, brake or clutch)")]
    UnknownPedal(String),

    #[error("unknown setting '{0}' (expected deadzone, min, max, curve or invert)")]
    UnknownSetting(String),

    #[error("unknown curve '{0}' (expected linear, exponential or logarithmic)")]
    UnknownCurve(String),

    #[error("setting '{setting}' expects a {expected} value")]
    WrongKind {
        setting: &'static str,
        expected: &'static str,
    },

    #[error("setting '{setting}' must be a finite number, got {value}")]
    NotFinite { setting: &'static str, value: f64 },
}

/// Result type alias for Pedal Relay
pub type Result<T> = std::result::Result<T, PedalRelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_read_message() {
        let err = DecodeError::ShortRead { len: 3 };
        assert_eq!(err.to_string(), "short read: 3 of 8 bytes");
    }

    #[test]
    fn test_source_unavailable_mentions_path() {
        let err = SourceUnavailable {
            path: PathBuf::from("/dev/input/js7"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/dev/input/js7"));
    }

    #[test]
    fn test_creation_error_converts() {
        let err: PedalRelayError = CreationError {
            name: "Test".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert!(matches!(err, PedalRelayError::Creation(_)));
        assert!(err.to_string().contains("Test"));
    }
}
