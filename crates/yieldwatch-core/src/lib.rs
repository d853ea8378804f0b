//! yieldwatch Core - Core types for the yieldwatch capture pipeline monitor
//!
//! This crate provides the data types shared by every stage of the monitor:
//! - Session records and the error entries providers attach to them
//! - Rule outcomes and the per-session outcome map
//! - Error types

pub mod error;
pub mod outcome;
pub mod record;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use outcome::{OutcomeMap, OutcomeStatus, RecordOutcomes, RuleOutcome};
pub use record::{ErrorKind, ErrorRecord, SessionRecord};

/// Arbitrary provider data stored in record metadata
pub use serde_json::Value;
