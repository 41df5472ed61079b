//! Error handling for Reactor
//!
//! The processing path never fails; these errors come from file I/O,
//! configuration loading and the by-name parameter interface.

use thiserror::Error;

/// Result type alias for Reactor operations
pub type Result<T> = std::result::Result<T, ReactorError>;

/// Main error type for Reactor operations
#[derive(Error, Debug)]
pub enum ReactorError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // Parameter Errors
    #[error("Invalid value {value} for parameter '{param}' (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Unknown parameter: {param}")]
    UnknownParameter { param: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReactorError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ReactorError::FileNotFound { .. } => "FILE_NOT_FOUND",
            ReactorError::InvalidAudio { .. } => "INVALID_AUDIO",
            ReactorError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            ReactorError::InvalidParameter { .. } => "INVALID_PARAMETER",
            ReactorError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            ReactorError::Config { .. } => "CONFIG_ERROR",
            ReactorError::Io(_) => "IO_ERROR",
            ReactorError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ReactorError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            ReactorError::InvalidAudio { .. } => vec![
                "Check if the file plays in another application",
                "Re-export the file as WAV from the source",
            ],
            ReactorError::UnsupportedFormat { .. } => vec![
                "Convert to a 16-bit, 24-bit or 32-bit float WAV file",
            ],
            ReactorError::InvalidParameter { .. } => vec![
                "Keep the value inside the documented parameter range",
            ],
            ReactorError::UnknownParameter { .. } => vec![
                "Run 'reactor render --help' for the list of parameters",
            ],
            ReactorError::Config { .. } | ReactorError::Serialization(_) => vec![
                "Check the configuration file is valid JSON",
                "Remove unknown fields; missing fields fall back to defaults",
            ],
            ReactorError::Io(_) => vec![],
        }
    }
}
