//! Rule trees
//!
//! Trees are assembled bottom-up with the builder methods on [`RuleNode`]
//! and sealed into a [`RuleTree`], which checks that node names are unique.
//! Children are owned by their parent, so a node can have only one parent
//! and cycles cannot be built.

use super::{FnRule, Rule, RuleError};
use crate::error::{Result, RuntimeError};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use yieldwatch_core::{RuleOutcome, SessionRecord};

/// One condition in a rule tree
#[derive(Clone)]
pub struct RuleNode {
    name: String,
    rule: Arc<dyn Rule>,
    children: Vec<RuleNode>,
}

impl RuleNode {
    /// Wrap a rule, naming the node after the rule
    pub fn new(rule: Arc<dyn Rule>) -> Self {
        Self {
            name: rule.name().to_string(),
            rule,
            children: Vec::new(),
        }
    }

    /// Wrap a rule under an explicit node name
    pub fn named(name: impl Into<String>, rule: Arc<dyn Rule>) -> Self {
        Self {
            name: name.into(),
            rule,
            children: Vec::new(),
        }
    }

    /// Node backed by a closure
    pub fn from_fn<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&SessionRecord) -> std::result::Result<RuleOutcome, RuleError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(Arc::new(FnRule::new(name, check)))
    }

    /// Append one child
    pub fn with_child(mut self, child: RuleNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children, keeping their order
    pub fn with_children(mut self, children: impl IntoIterator<Item = RuleNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append several children in place
    pub fn add_children(&mut self, children: impl IntoIterator<Item = RuleNode>) -> &mut Self {
        self.children.extend(children);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> &Arc<dyn Rule> {
        &self.rule
    }

    pub fn children(&self) -> &[RuleNode] {
        &self.children
    }

    /// Run the wrapped rule
    pub fn evaluate(&self, record: &SessionRecord) -> std::result::Result<RuleOutcome, RuleError> {
        self.rule.evaluate(record)
    }

    fn visit_pre_order<'a>(&'a self, out: &mut Vec<&'a RuleNode>) {
        out.push(self);
        for child in &self.children {
            child.visit_pre_order(out);
        }
    }

    fn collect_edges<'a>(&'a self, out: &mut Vec<(&'a RuleNode, &'a RuleNode)>) {
        for child in &self.children {
            out.push((self, child));
            child.collect_edges(out);
        }
    }

    fn depth(&self) -> usize {
        1 + self.children.iter().map(RuleNode::depth).max().unwrap_or(0)
    }
}

impl fmt::Debug for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleNode")
            .field("name", &self.name)
            .field("children", &self.children)
            .finish()
    }
}

/// A validated, immutable rule tree
///
/// Cheap to clone; clones share the same nodes.
#[derive(Clone, Debug)]
pub struct RuleTree {
    root: Arc<RuleNode>,
}

impl RuleTree {
    /// Seal a tree, rejecting empty or repeated node names
    pub fn new(root: RuleNode) -> Result<Self> {
        validate_names(&root)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &RuleNode {
        &self.root
    }

    /// Name of the root node
    pub fn name(&self) -> &str {
        &self.root.name
    }

    /// All nodes in pre-order
    pub fn nodes(&self) -> Vec<&RuleNode> {
        let mut nodes = Vec::new();
        self.root.visit_pre_order(&mut nodes);
        nodes
    }

    /// All node names in pre-order
    pub fn names(&self) -> Vec<&str> {
        self.nodes().into_iter().map(RuleNode::name).collect()
    }

    /// Parent -> child pairs, each emitted before descending into the child
    pub fn edges(&self) -> Vec<(&RuleNode, &RuleNode)> {
        let mut edges = Vec::new();
        self.root.collect_edges(&mut edges);
        edges
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    /// Always false, a tree has at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

fn validate_names(root: &RuleNode) -> Result<()> {
    let mut nodes = Vec::new();
    root.visit_pre_order(&mut nodes);

    let mut seen = HashSet::new();
    for node in nodes {
        if node.name.is_empty() {
            return Err(RuntimeError::EmptyRuleName);
        }
        if !seen.insert(node.name.as_str()) {
            return Err(RuntimeError::DuplicateRuleName {
                name: node.name.clone(),
                root: root.name.clone(),
            });
        }
    }
    Ok(())
}
