//! Rule outcomes
//!
//! A [`RuleOutcome`] is produced once per (session, rule) pair during an
//! evaluation pass. Outcomes for a whole batch are collected in an
//! [`OutcomeMap`] keyed by study key, then by rule name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Key in [`RuleOutcome::extra`] holding the [`OutcomeStatus`]
pub const STATUS_KEY: &str = "status";

/// Key in [`RuleOutcome::extra`] holding a rule failure description
pub const EXCEPTION_KEY: &str = "exception";

/// Message used for outcomes of rules below a failed ancestor
pub const BLOCKED_MESSAGE: &str = "Blocked by parent failure";

/// Engine-assigned status of an outcome that did not come from the rule itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// An ancestor failed, the rule was never evaluated
    Blocked,

    /// The rule itself failed while evaluating
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Blocked => "BLOCKED",
            OutcomeStatus::Error => "ERROR",
        }
    }

    /// Parse a status string as written into outcome extras
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BLOCKED" => Some(OutcomeStatus::Blocked),
            "ERROR" => Some(OutcomeStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one rule against one session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Whether the check passed
    pub passed: bool,

    /// Name of the rule node that produced this outcome
    pub rule_name: String,

    /// Explanation, usually empty unless the check failed
    #[serde(default)]
    pub message: String,

    /// Additional structured context
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl RuleOutcome {
    /// A passing outcome
    pub fn pass() -> Self {
        Self {
            passed: true,
            rule_name: String::new(),
            message: String::new(),
            extra: BTreeMap::new(),
        }
    }

    /// A failing outcome with an explanation
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            rule_name: String::new(),
            message: message.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Outcome for a rule whose ancestor failed
    pub fn blocked(rule_name: impl Into<String>) -> Self {
        Self::fail(BLOCKED_MESSAGE)
            .with_rule_name(rule_name)
            .with_extra(STATUS_KEY, OutcomeStatus::Blocked.as_str())
    }

    /// Outcome for a rule whose evaluation failed
    pub fn errored(rule_name: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self::fail(format!("Rule Exception: {}", description))
            .with_rule_name(rule_name)
            .with_extra(STATUS_KEY, OutcomeStatus::Error.as_str())
            .with_extra(EXCEPTION_KEY, description)
    }

    /// Set the rule name
    pub fn with_rule_name(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = rule_name.into();
        self
    }

    /// Set the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach extra context
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Engine-assigned status, if any
    pub fn status(&self) -> Option<OutcomeStatus> {
        self.extra
            .get(STATUS_KEY)
            .and_then(Value::as_str)
            .and_then(OutcomeStatus::parse)
    }

    pub fn is_blocked(&self) -> bool {
        self.status() == Some(OutcomeStatus::Blocked)
    }

    pub fn is_error(&self) -> bool {
        self.status() == Some(OutcomeStatus::Error)
    }
}

/// Outcomes of one session record, keyed by rule name
pub type RecordOutcomes = BTreeMap<String, RuleOutcome>;

/// Outcomes of a whole batch: study key -> rule name -> outcome
///
/// Backed by ordered maps so that iteration, and anything rendered from it,
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeMap {
    inner: BTreeMap<String, RecordOutcomes>,
}

impl OutcomeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the outcomes of one record, replacing any previous entry
    pub fn insert(&mut self, study_key: impl Into<String>, outcomes: RecordOutcomes) {
        self.inner.insert(study_key.into(), outcomes);
    }

    /// Outcomes of one record
    pub fn get(&self, study_key: &str) -> Option<&RecordOutcomes> {
        self.inner.get(study_key)
    }

    /// Outcome of one rule for one record
    pub fn outcome(&self, study_key: &str, rule_name: &str) -> Option<&RuleOutcome> {
        self.inner.get(study_key)?.get(rule_name)
    }

    /// Whether `rule_name` passed for `study_key`; missing entries count as not passed
    pub fn passed(&self, study_key: &str, rule_name: &str) -> bool {
        self.outcome(study_key, rule_name)
            .map_or(false, |outcome| outcome.passed)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RecordOutcomes)> {
        self.inner.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &RecordOutcomes> {
        self.inner.values()
    }
}

impl FromIterator<(String, RecordOutcomes)> for OutcomeMap {
    fn from_iter<I: IntoIterator<Item = (String, RecordOutcomes)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
