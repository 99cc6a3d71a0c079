//! Error types for audio-governor
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for audio-governor
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Quality value outside the valid range
    #[error("Audio quality must be between 0.0 and 1.0, got: {0}")]
    InvalidQuality(f64),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Settings store value of an unexpected shape
    #[error("Settings error: {0}")]
    Settings(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using audio-governor Error
pub type Result<T> = std::result::Result<T, Error>;
