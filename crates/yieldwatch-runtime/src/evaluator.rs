//! Rule tree evaluation
//!
//! Each record is evaluated against every tree independently. A node whose
//! parent did not pass is recorded as BLOCKED without running its rule; a
//! rule that returns an error or panics is recorded as ERROR. Both count as
//! failures for the node's own children.

use crate::error::panic_message;
use crate::rule::{RuleNode, RuleTree};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info};
use yieldwatch_core::{OutcomeMap, RecordOutcomes, RuleOutcome, SessionRecord};

/// Evaluates rule trees against session records
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    trees: Vec<RuleTree>,
}

impl Evaluator {
    /// Create an evaluator for the given root trees
    pub fn new(trees: Vec<RuleTree>) -> Self {
        Self { trees }
    }

    pub fn trees(&self) -> &[RuleTree] {
        &self.trees
    }

    /// Evaluate every tree against every record
    pub fn evaluate(&self, records: &[SessionRecord]) -> OutcomeMap {
        let mut outcomes = OutcomeMap::new();

        for record in records {
            outcomes.insert(record.study_key(), self.evaluate_record(record));
        }

        info!(
            "Rule evaluation complete: {} studies processed against {} trees",
            outcomes.len(),
            self.trees.len()
        );
        outcomes
    }

    /// Evaluate every tree against one record
    ///
    /// When two trees contain a node of the same name, the later tree's
    /// outcome replaces the earlier one.
    pub fn evaluate_record(&self, record: &SessionRecord) -> RecordOutcomes {
        let mut results = RecordOutcomes::new();
        for tree in &self.trees {
            visit(tree.root(), record, &mut results, true);
        }
        results
    }
}

fn visit(
    node: &RuleNode,
    record: &SessionRecord,
    results: &mut RecordOutcomes,
    parent_passed: bool,
) {
    let outcome = if parent_passed {
        evaluate_node(node, record)
    } else {
        RuleOutcome::blocked(node.name())
    };

    let passed = outcome.passed;
    results.insert(node.name().to_string(), outcome);

    for child in node.children() {
        visit(child, record, results, passed);
    }
}

fn evaluate_node(node: &RuleNode, record: &SessionRecord) -> RuleOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| node.evaluate(record))) {
        Ok(Ok(outcome)) => {
            debug!(
                "Rule '{}' on {}: passed={}",
                node.name(),
                record.study_key(),
                outcome.passed
            );
            outcome.with_rule_name(node.name())
        }
        Ok(Err(e)) => {
            error!("Rule '{}' failed with exception: {}", node.name(), e);
            RuleOutcome::errored(node.name(), e.to_string())
        }
        Err(payload) => {
            let description = panic_message(&*payload);
            error!("Rule '{}' panicked: {}", node.name(), description);
            RuleOutcome::errored(node.name(), description)
        }
    }
}
