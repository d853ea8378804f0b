//! yieldwatch Runtime - Enrichment, evaluation and reporting engine
//!
//! This crate provides the three stages a batch of session records goes
//! through:
//! - [`Enricher`]: runs every [`Provider`] concurrently against the batch
//! - [`Evaluator`]: walks each [`RuleTree`] once per record
//! - [`Reporter`]: renders per-record results and the stage flow graph

pub mod enricher;
pub mod error;
pub mod evaluator;
pub mod provider;
pub mod report;
pub mod rule;

// Re-export main types
pub use enricher::{Enricher, EnrichmentSummary, ProviderFailure, RecordBatch};
pub use error::{Result, RuntimeError};
pub use evaluator::Evaluator;
pub use provider::{Provider, ProviderError};
pub use report::{FlowGraph, FlowLink, FlowSummary, RecordReport, Report, Reporter, START_NODE};
pub use rule::{FnRule, Rule, RuleError, RuleNode, RuleTree};
