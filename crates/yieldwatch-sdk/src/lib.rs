//! yieldwatch SDK
//!
//! High-level API for running a capture pipeline monitor: configure
//! providers and rule trees once, then turn batches of session records into
//! reports.

pub mod builder;
pub mod config;
pub mod error;
pub mod monitor;
pub mod sessions;

// Re-export main types
pub use builder::YieldMonitorBuilder;
pub use config::{MonitorConfig, ReportConfig};
pub use error::{Result, SdkError};
pub use monitor::{run_monitor, MonitorDefinition, YieldMonitor};
pub use sessions::{parse_sessions, SessionSpec};

// Re-export commonly used types from dependencies
pub use yieldwatch_core::{ErrorKind, ErrorRecord, RuleOutcome, SessionRecord};
pub use yieldwatch_runtime::{
    FlowLink, Provider, ProviderError, Report, Rule, RuleError, RuleNode, RuleTree, RuntimeError,
};
