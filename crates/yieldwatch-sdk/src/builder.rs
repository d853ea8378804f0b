//! Builder pattern for YieldMonitor

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::monitor::{MonitorDefinition, YieldMonitor};
use std::sync::Arc;
use tracing::debug;
use yieldwatch_runtime::{
    Enricher, Evaluator, Provider, Reporter, RuleNode, RuleTree, RuntimeError,
};

/// Builder for YieldMonitor
///
/// # Example
///
/// ```rust,ignore
/// use yieldwatch_sdk::{MonitorConfig, RuleNode, YieldMonitorBuilder};
///
/// let monitor = YieldMonitorBuilder::new()
///     .with_config(MonitorConfig::load()?)
///     .add_provider(Arc::new(DataLakeProvider::default()))
///     .add_root(RuleNode::from_fn("Scheduled", is_scheduled))
///     .build()?;
///
/// let report = monitor.run(records).await;
/// ```
pub struct YieldMonitorBuilder {
    config: MonitorConfig,
    providers: Vec<Arc<dyn Provider>>,
    roots: Vec<PendingRoot>,
}

/// A root as handed to the builder, kept in call order
enum PendingRoot {
    Tree(RuleTree),
    Node(RuleNode),
}

impl PendingRoot {
    fn into_tree(self) -> std::result::Result<RuleTree, RuntimeError> {
        match self {
            PendingRoot::Tree(tree) => Ok(tree),
            PendingRoot::Node(root) => RuleTree::new(root),
        }
    }
}

impl YieldMonitorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: MonitorConfig::new(),
            providers: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Set the whole configuration
    pub fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a provider
    pub fn add_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add multiple providers
    pub fn add_providers(mut self, providers: impl IntoIterator<Item = Arc<dyn Provider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Add an already validated rule tree
    pub fn add_rule_tree(mut self, tree: RuleTree) -> Self {
        self.roots.push(PendingRoot::Tree(tree));
        self
    }

    /// Add a root node; its tree is validated by [`build`](Self::build)
    pub fn add_root(mut self, root: RuleNode) -> Self {
        self.roots.push(PendingRoot::Node(root));
        self
    }

    /// Take providers and rule trees from a monitor definition
    pub fn with_definition(mut self, definition: &dyn MonitorDefinition) -> Result<Self> {
        let providers = definition.providers();
        let trees = definition.rule_trees()?;

        debug!(
            "Monitor '{}' contributes {} providers and {} rule trees",
            definition.name(),
            providers.len(),
            trees.len()
        );

        self.providers.extend(providers);
        self.roots.extend(trees.into_iter().map(PendingRoot::Tree));
        Ok(self)
    }

    /// Set the per-provider timeout
    pub fn with_provider_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config = self.config.with_provider_timeout(timeout);
        self
    }

    /// Build the monitor
    pub fn build(self) -> Result<YieldMonitor> {
        self.config.validate()?;

        // Root order decides start-link order and which same-named outcome wins
        let trees = self
            .roots
            .into_iter()
            .map(PendingRoot::into_tree)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut enricher = Enricher::new(self.providers);
        if let Some(timeout) = self.config.provider_timeout() {
            enricher = enricher.with_timeout(timeout);
        }

        let reporter = Reporter::new()
            .with_metadata_keys(self.config.report.metadata_keys.iter().cloned())
            .include_flow_summary(self.config.report.include_flow_summary);

        debug!(
            "Building monitor with {} providers and {} rule trees",
            enricher.providers().len(),
            trees.len()
        );

        Ok(YieldMonitor::from_parts(
            self.config,
            enricher,
            Evaluator::new(trees),
            reporter,
        ))
    }
}

impl Default for YieldMonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use async_trait::async_trait;
    use std::time::Duration;
    use yieldwatch_core::{RuleOutcome, SessionRecord};
    use yieldwatch_runtime::ProviderError;

    struct NoopProvider(&'static str);

    #[async_trait]
    impl Provider for NoopProvider {
        fn name(&self) -> &str {
            self.0
        }

        async fn apply(
            &self,
            _records: &[SessionRecord],
        ) -> std::result::Result<(), ProviderError> {
            Ok(())
        }
    }

    fn passing(name: &str) -> RuleNode {
        RuleNode::from_fn(name, |_: &SessionRecord| Ok(RuleOutcome::pass()))
    }

    struct Definition {
        duplicate: bool,
    }

    #[async_trait]
    impl MonitorDefinition for Definition {
        fn name(&self) -> &str {
            "definition"
        }

        async fn load_records(&self) -> anyhow::Result<Vec<SessionRecord>> {
            Ok(Vec::new())
        }

        fn providers(&self) -> Vec<Arc<dyn Provider>> {
            vec![Arc::new(NoopProvider("datalake")), Arc::new(NoopProvider("datahub"))]
        }

        fn rule_trees(&self) -> std::result::Result<Vec<RuleTree>, RuntimeError> {
            let child = if self.duplicate { "Scheduled" } else { "Executed" };
            Ok(vec![RuleTree::new(passing("Scheduled").with_child(passing(child)))?])
        }
    }

    #[test]
    fn test_builder_new() {
        let builder = YieldMonitorBuilder::new();
        assert!(builder.providers.is_empty());
        assert!(builder.roots.is_empty());
        assert_eq!(builder.config, MonitorConfig::default());
    }

    #[test]
    fn test_builder_default() {
        let builder = YieldMonitorBuilder::default();
        assert!(builder.providers.is_empty());
    }

    #[test]
    fn test_builder_adds_providers_in_order() {
        let monitor = YieldMonitorBuilder::new()
            .add_provider(Arc::new(NoopProvider("first")))
            .add_providers(vec![
                Arc::new(NoopProvider("second")) as Arc<dyn Provider>,
                Arc::new(NoopProvider("third")),
            ])
            .build()
            .unwrap();

        let names: Vec<&str> = monitor.providers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_builder_keeps_root_insertion_order() {
        let monitor = YieldMonitorBuilder::new()
            .add_root(passing("RootB"))
            .add_rule_tree(RuleTree::new(passing("RootA")).unwrap())
            .add_root(passing("RootC"))
            .build()
            .unwrap();

        let names: Vec<&str> = monitor.trees().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["RootB", "RootA", "RootC"]);
    }

    #[tokio::test]
    async fn test_later_root_overwrites_shared_rule() {
        let failing = RuleNode::from_fn("Second", |_: &SessionRecord| {
            Ok(RuleOutcome::fail("not scheduled"))
        });

        let monitor = YieldMonitorBuilder::new()
            .add_root(passing("First").with_child(passing("Shared")))
            .add_rule_tree(RuleTree::new(failing.with_child(passing("Shared"))).unwrap())
            .build()
            .unwrap();

        let record = SessionRecord::new("id055", "20240104", "0945").unwrap();
        let report = monitor.run(vec![record]).await;

        let steps = &report.results["study_id055_20240104"].pipeline_steps;
        assert_eq!(steps["Shared"]["passed"], serde_json::json!(false));
        assert_eq!(steps["Shared"]["status"], serde_json::json!("BLOCKED"));

        // Shared no longer counts as passed under First
        let links: Vec<(&str, &str)> = report
            .flow()
            .iter()
            .map(|l| (l.source.as_str(), l.target.as_str()))
            .collect();
        assert_eq!(links, vec![("_start", "First")]);
    }

    #[test]
    fn test_builder_rejects_duplicate_root_names() {
        let result = YieldMonitorBuilder::new()
            .add_root(passing("Scheduled").with_child(passing("Scheduled")))
            .build();

        assert!(matches!(
            result,
            Err(SdkError::Runtime(RuntimeError::DuplicateRuleName { .. }))
        ));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let result = YieldMonitorBuilder::new()
            .with_provider_timeout(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(SdkError::Config(_))));
    }

    #[test]
    fn test_builder_applies_config() {
        let config = MonitorConfig::new()
            .with_provider_timeout(Duration::from_secs(2))
            .with_metadata_keys(["manifold"]);

        let monitor = YieldMonitorBuilder::new()
            .with_config(config.clone())
            .build()
            .unwrap();

        assert_eq!(monitor.config(), &config);
    }

    #[test]
    fn test_builder_with_definition() {
        let monitor = YieldMonitorBuilder::new()
            .with_definition(&Definition { duplicate: false })
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(monitor.providers().len(), 2);
        assert_eq!(monitor.trees().len(), 1);
        assert_eq!(monitor.trees()[0].names(), vec!["Scheduled", "Executed"]);
    }

    #[test]
    fn test_builder_with_invalid_definition() {
        let result = YieldMonitorBuilder::new().with_definition(&Definition { duplicate: true });
        assert!(matches!(result, Err(SdkError::Runtime(_))));
    }
}
