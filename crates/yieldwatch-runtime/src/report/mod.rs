//! Report generation
//!
//! Combines enriched records and evaluation outcomes into the report
//! consumed by dashboards: per-study results plus an optional flow summary.

mod flow;

pub use flow::{FlowGraph, FlowLink, START_NODE};

use crate::rule::RuleTree;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::info;
use yieldwatch_core::{ErrorRecord, OutcomeMap, RuleOutcome, SessionRecord};

/// Metadata keys reported when none are configured
pub const DEFAULT_METADATA_KEYS: &[&str] = &["datalake", "datahub"];

/// Field names of a serialized [`RecordReport`]; metadata keys are flattened
/// next to them and must not reuse them
pub const RESERVED_RESULT_KEYS: &[&str] = &["date", "time", "participantId", "errors", "pipelineSteps"];

/// Results of one study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordReport {
    pub date: String,
    pub time: String,
    pub participant_id: String,

    /// Provider data, one entry per reported metadata key
    #[serde(flatten)]
    pub provider_data: BTreeMap<String, Value>,

    pub errors: Vec<ErrorRecord>,

    /// Rule name -> `{passed, message, ...extra}`
    pub pipeline_steps: BTreeMap<String, Map<String, Value>>,
}

/// Aggregate flow across all studies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub sankey_links: FlowGraph,
}

/// Complete monitor report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Study key -> results
    pub results: BTreeMap<String, RecordReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_summary: Option<FlowSummary>,
}

impl Report {
    /// Compact JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// JSON value
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Flow links, empty when no flow summary was produced
    pub fn flow(&self) -> &[FlowLink] {
        self.flow_summary
            .as_ref()
            .map(|summary| summary.sankey_links.links())
            .unwrap_or(&[])
    }
}

/// Builds reports from records and outcomes
#[derive(Debug, Clone)]
pub struct Reporter {
    metadata_keys: Vec<String>,
    include_flow_summary: bool,
}

impl Reporter {
    /// Create a reporter with the default metadata keys
    pub fn new() -> Self {
        Self {
            metadata_keys: DEFAULT_METADATA_KEYS.iter().map(|k| k.to_string()).collect(),
            include_flow_summary: true,
        }
    }

    /// Replace the metadata keys copied into each study's results
    pub fn with_metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the flow summary
    pub fn include_flow_summary(mut self, include: bool) -> Self {
        self.include_flow_summary = include;
        self
    }

    pub fn metadata_keys(&self) -> &[String] {
        &self.metadata_keys
    }

    /// Generate the report
    ///
    /// The flow summary is only produced when `trees` is given and not empty.
    pub fn report(
        &self,
        records: &[SessionRecord],
        outcomes: &OutcomeMap,
        trees: Option<&[RuleTree]>,
    ) -> Report {
        let results: BTreeMap<String, RecordReport> = records
            .iter()
            .map(|record| (record.study_key(), self.record_report(record, outcomes)))
            .collect();

        let flow_summary = match trees {
            Some(trees) if self.include_flow_summary && !trees.is_empty() => Some(FlowSummary {
                sankey_links: FlowGraph::from_outcomes(trees, outcomes),
            }),
            _ => None,
        };

        info!(
            "Report generated: {} studies, {} flow links",
            results.len(),
            flow_summary
                .as_ref()
                .map_or(0, |summary| summary.sankey_links.len())
        );

        Report {
            results,
            flow_summary,
        }
    }

    /// Results of a single record
    pub fn record_report(&self, record: &SessionRecord, outcomes: &OutcomeMap) -> RecordReport {
        let provider_data = self
            .metadata_keys
            .iter()
            .map(|key| {
                let data = record
                    .metadata(key)
                    .unwrap_or_else(|| Value::Object(Map::new()));
                (key.clone(), data)
            })
            .collect();

        let pipeline_steps = outcomes
            .get(&record.study_key())
            .map(|steps| {
                steps
                    .iter()
                    .map(|(name, outcome)| (name.clone(), step_entry(outcome)))
                    .collect()
            })
            .unwrap_or_default();

        RecordReport {
            date: record.capture_date().to_string(),
            time: record.capture_time().to_string(),
            participant_id: record.participant_id().to_string(),
            provider_data,
            errors: record.errors(),
            pipeline_steps,
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

// Extra fields are written last and win over `passed`/`message`.
fn step_entry(outcome: &RuleOutcome) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("passed".to_string(), Value::Bool(outcome.passed));
    entry.insert("message".to_string(), Value::String(outcome.message.clone()));
    for (key, value) in &outcome.extra {
        entry.insert(key.clone(), value.clone());
    }
    entry
}
