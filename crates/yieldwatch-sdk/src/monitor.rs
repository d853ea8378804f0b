//! YieldMonitor - Main API for monitoring a capture pipeline

use crate::builder::YieldMonitorBuilder;
use crate::config::MonitorConfig;
use crate::error::{Result, SdkError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use yieldwatch_core::SessionRecord;
use yieldwatch_runtime::{
    Enricher, Evaluator, Provider, RecordBatch, Report, Reporter, RuleTree, RuntimeError,
};

/// A complete monitor: where records come from, who enriches them and which
/// stages they are checked against
///
/// # Example
///
/// ```rust,ignore
/// struct CaptureMonitor;
///
/// #[async_trait]
/// impl MonitorDefinition for CaptureMonitor {
///     fn name(&self) -> &str {
///         "capture"
///     }
///
///     async fn load_records(&self) -> anyhow::Result<Vec<SessionRecord>> {
///         Ok(parse_sessions(&std::fs::read_to_string("sessions.json")?)?)
///     }
///
///     fn providers(&self) -> Vec<Arc<dyn Provider>> {
///         vec![Arc::new(DataLakeProvider::default())]
///     }
///
///     fn rule_trees(&self) -> Result<Vec<RuleTree>, RuntimeError> {
///         Ok(vec![RuleTree::new(capture_stages())?])
///     }
/// }
/// ```
#[async_trait]
pub trait MonitorDefinition: Send + Sync {
    /// Monitor name, used in logs and errors
    fn name(&self) -> &str;

    /// Fetch the session records to check
    async fn load_records(&self) -> anyhow::Result<Vec<SessionRecord>>;

    /// Providers enriching the records
    fn providers(&self) -> Vec<Arc<dyn Provider>>;

    /// Stage hierarchies evaluated against each record
    fn rule_trees(&self) -> std::result::Result<Vec<RuleTree>, RuntimeError>;
}

/// Runs enrich -> evaluate -> report over batches of session records
pub struct YieldMonitor {
    config: MonitorConfig,
    enricher: Enricher,
    evaluator: Evaluator,
    reporter: Reporter,
}

impl YieldMonitor {
    pub(crate) fn from_parts(
        config: MonitorConfig,
        enricher: Enricher,
        evaluator: Evaluator,
        reporter: Reporter,
    ) -> Self {
        Self {
            config,
            enricher,
            evaluator,
            reporter,
        }
    }

    /// Start building a monitor
    pub fn builder() -> YieldMonitorBuilder {
        YieldMonitorBuilder::new()
    }

    /// Configuration the monitor was built with
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Configured rule trees, in evaluation order
    pub fn trees(&self) -> &[RuleTree] {
        self.evaluator.trees()
    }

    /// Configured providers
    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        self.enricher.providers()
    }

    /// Enrich, evaluate and report a batch of records
    pub async fn run(&self, records: Vec<SessionRecord>) -> Report {
        self.run_batch(RecordBatch::from(records)).await
    }

    /// Same as [`run`](Self::run) for a batch that is already shared
    ///
    /// The records keep whatever metadata and errors the providers attached,
    /// so callers holding the batch can inspect them afterwards.
    pub async fn run_batch(&self, records: RecordBatch) -> Report {
        if records.is_empty() {
            warn!("No session records to monitor");
        }

        let summary = self.enricher.enrich_with_summary(&records).await;
        if summary.is_clean() {
            info!(
                "Enrichment complete: {} providers succeeded",
                summary.succeeded.len()
            );
        } else {
            for failure in &summary.failed {
                warn!(
                    "Provider '{}' failed, its data is missing from every record: {}",
                    failure.provider, failure.description
                );
            }
        }

        let outcomes = self.evaluator.evaluate(&records);
        debug!(
            "Evaluated {} rule trees for {} studies",
            self.evaluator.trees().len(),
            outcomes.len()
        );

        self.reporter
            .report(&records, &outcomes, Some(self.evaluator.trees()))
    }
}

/// Build a monitor from `definition`, load its records and run it once
pub async fn run_monitor(
    definition: &dyn MonitorDefinition,
    config: MonitorConfig,
) -> Result<Report> {
    let monitor = YieldMonitorBuilder::new()
        .with_config(config)
        .with_definition(definition)?
        .build()?;

    let records = definition
        .load_records()
        .await
        .map_err(|source| SdkError::LoadRecords {
            monitor: definition.name().to_string(),
            source,
        })?;

    info!(
        "Monitor '{}' loaded {} session records",
        definition.name(),
        records.len()
    );

    Ok(monitor.run(records).await)
}
