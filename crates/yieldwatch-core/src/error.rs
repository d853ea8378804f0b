//! Error types for yieldwatch Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid capture date: {0}")]
    InvalidCaptureDate(String),

    #[error("Invalid capture time: {0}")]
    InvalidCaptureTime(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
