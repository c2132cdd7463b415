//! Error types for the analysis pipeline

use thiserror::Error;

/// Errors that can occur during audio analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Input audio file does not exist
    #[error("Audio file not found: {0}")]
    FileNotFound(String),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio decoding error
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Processing error during analysis
    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Optional model backend failed to load or run
    #[error("Backend error ({backend}): {message}")]
    Backend {
        /// Capability name of the failing backend
        backend: String,
        /// Failure description
        message: String,
    },

    /// Filesystem error while reading input or writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report or config (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Whether this error must abort the whole run.
    ///
    /// Only missing or undecodable input is fatal; everything else is
    /// captured per stage and surfaced in the report.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::FileNotFound(_) | AnalysisError::DecodingError(_)
        )
    }

    pub(crate) fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AnalysisError>;
