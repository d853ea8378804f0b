//! Stage flow aggregation for Sankey-style visualisation
//!
//! Every parent -> child edge of every rule tree becomes a link whose value
//! is the number of studies for which both endpoints passed. Each root also
//! gets a link from the synthetic [`START_NODE`]. Links with a zero count
//! are omitted.

use crate::rule::RuleTree;
use serde::{Deserialize, Serialize};
use tracing::debug;
use yieldwatch_core::{OutcomeMap, RecordOutcomes};

/// Synthetic source node feeding every root
pub const START_NODE: &str = "_start";

/// One directed, weighted edge of the flow graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub value: u64,
}

impl FlowLink {
    pub fn new(source: impl Into<String>, target: impl Into<String>, value: u64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            value,
        }
    }
}

/// Ordered list of flow links
///
/// Start links come first in root order, followed by the edges of each tree
/// in pre-order, an edge into a child always preceding the edges below it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowGraph {
    links: Vec<FlowLink>,
}

impl FlowGraph {
    /// Aggregate evaluation outcomes over the given trees
    pub fn from_outcomes(trees: &[RuleTree], outcomes: &OutcomeMap) -> Self {
        let mut start_links = Vec::new();
        let mut edge_links = Vec::new();

        for tree in trees {
            let root = tree.name();
            let root_passed = count_where(outcomes, |steps| passed(steps, root));
            if root_passed > 0 {
                start_links.push(FlowLink::new(START_NODE, root, root_passed));
            }

            for (parent, child) in tree.edges() {
                let value = count_where(outcomes, |steps| {
                    passed(steps, parent.name()) && passed(steps, child.name())
                });
                if value > 0 {
                    edge_links.push(FlowLink::new(parent.name(), child.name(), value));
                }
            }
        }

        debug!(
            "Flow graph built: {} start links, {} stage links",
            start_links.len(),
            edge_links.len()
        );

        start_links.extend(edge_links);
        Self { links: start_links }
    }

    pub fn links(&self) -> &[FlowLink] {
        &self.links
    }

    /// Find the link between two nodes
    pub fn link(&self, source: &str, target: &str) -> Option<&FlowLink> {
        self.links
            .iter()
            .find(|link| link.source == source && link.target == target)
    }

    /// Sum of all link values flowing into `target`
    pub fn total_into(&self, target: &str) -> u64 {
        self.links
            .iter()
            .filter(|link| link.target == target)
            .map(|link| link.value)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

fn passed(steps: &RecordOutcomes, rule_name: &str) -> bool {
    steps.get(rule_name).map_or(false, |outcome| outcome.passed)
}

fn count_where(outcomes: &OutcomeMap, predicate: impl Fn(&RecordOutcomes) -> bool) -> u64 {
    outcomes.values().filter(|steps| predicate(steps)).count() as u64
}
