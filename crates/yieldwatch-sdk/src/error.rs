//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid session record
    #[error("Invalid session: {0}")]
    Core(#[from] yieldwatch_core::CoreError),

    /// Rule tree construction error
    #[error("Runtime error: {0}")]
    Runtime(#[from] yieldwatch_runtime::RuntimeError),

    /// Malformed session input
    #[error("Failed to parse sessions: {0}")]
    Parse(#[from] serde_json::Error),

    /// A monitor definition could not produce its records
    #[error("Failed to load records for monitor '{monitor}': {source}")]
    LoadRecords {
        monitor: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
