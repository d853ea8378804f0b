//! Rule abstraction
//!
//! A [`Rule`] checks one condition against a single session record. Rules
//! are wrapped in [`RuleNode`]s and wired into [`RuleTree`]s before any
//! batch is evaluated.

mod tree;

pub use tree::{RuleNode, RuleTree};

use std::fmt;
use thiserror::Error;
use yieldwatch_core::{RuleOutcome, SessionRecord};

/// Failure of a rule while evaluating one record
#[derive(Error, Debug)]
pub enum RuleError {
    /// Metadata the rule depends on is absent
    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    /// Metadata is present but has an unexpected shape
    #[error("Invalid data in '{field}': {detail}")]
    InvalidData { field: String, detail: String },

    /// Any other failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Condition evaluated against a single session record
///
/// The outcome's `rule_name` is always replaced by the name of the tree node
/// the rule is wired under, so implementations may leave it empty.
pub trait Rule: Send + Sync {
    /// Display name, used as the default node name
    fn name(&self) -> &str;

    /// Evaluate the rule against one record
    fn evaluate(&self, record: &SessionRecord) -> Result<RuleOutcome, RuleError>;
}

/// Rule backed by a closure
pub struct FnRule<F> {
    name: String,
    check: F,
}

impl<F> FnRule<F>
where
    F: Fn(&SessionRecord) -> Result<RuleOutcome, RuleError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&SessionRecord) -> Result<RuleOutcome, RuleError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, record: &SessionRecord) -> Result<RuleOutcome, RuleError> {
        (self.check)(record)
    }
}

impl<F> fmt::Debug for FnRule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule").field("name", &self.name).finish()
    }
}
