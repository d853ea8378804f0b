//! Runtime error types

use std::any::Any;
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Two nodes of one rule tree share a name
    #[error("Duplicate rule name '{name}' in tree rooted at '{root}'")]
    DuplicateRuleName { name: String, root: String },

    /// A rule node was given an empty name
    #[error("Rule node name must not be empty")]
    EmptyRuleName,
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Describe a panic payload caught at a provider or rule boundary
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
