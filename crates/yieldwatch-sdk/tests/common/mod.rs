//! Common test utilities for SDK integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use yieldwatch_sdk::{
    parse_sessions, ErrorKind, ErrorRecord, MonitorDefinition, Provider, ProviderError,
    RuleError, RuleNode, RuleOutcome, RuleTree, RuntimeError, SessionRecord,
};

pub const SESSIONS_JSON: &str = r#"[
    {"participant_id": "id055", "capture_date": "20240104", "capture_time": "0945"},
    {"participant_id": "id056", "capture_date": "20240104", "capture_time": "1015"},
    {"participant_id": "id057", "capture_date": "20240105", "capture_time": "1730"}
]"#;

/// Serves a fixed row per participant under `key`
pub struct MockProvider {
    name: String,
    key: String,
    rows: HashMap<String, Value>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            rows: HashMap::new(),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_row(mut self, participant: &str, row: Value) -> Self {
        self.rows.insert(participant.to_string(), row);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, records: &[SessionRecord]) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for record in records {
            match self.rows.get(record.participant_id()) {
                Some(row) => record.set_metadata(self.key.as_str(), row.clone()),
                None => record.push_error(ErrorRecord::new(
                    self.name.as_str(),
                    format!("no data for {}", record.participant_id()),
                    ErrorKind::MissingData,
                )),
            }
        }
        Ok(())
    }
}

/// Provider that always fails its query
pub struct BrokenProvider;

#[async_trait]
impl Provider for BrokenProvider {
    fn name(&self) -> &str {
        "BrokenProvider"
    }

    async fn apply(&self, _records: &[SessionRecord]) -> Result<(), ProviderError> {
        Err(ProviderError::Query("relation \"sessions\" does not exist".to_string()))
    }
}

/// Node passing when `metadata[key][field]` is `true`
pub fn flag_rule(name: &str, key: &'static str, field: &'static str) -> RuleNode {
    RuleNode::from_fn(name, move |record: &SessionRecord| {
        let data = record
            .metadata(key)
            .ok_or_else(|| RuleError::MissingMetadata(key.to_string()))?;
        match data.get(field).and_then(Value::as_bool) {
            Some(true) => Ok(RuleOutcome::pass()),
            _ => Ok(RuleOutcome::fail(format!("{} missing", field))),
        }
    })
}

/// Scheduled -> Executed -> RawData -> [Inference, Reporting]
pub fn capture_stages() -> RuleNode {
    flag_rule("Scheduled", "datalake", "scheduled").with_child(
        flag_rule("Executed", "datalake", "executed").with_child(
            flag_rule("RawData", "datalake", "raw").with_children([
                flag_rule("Inference", "datahub", "inference"),
                flag_rule("Reporting", "datahub", "reporting"),
            ]),
        ),
    )
}

pub fn datalake() -> MockProvider {
    MockProvider::new("DataLakeProvider", "datalake")
        .with_row("id055", json!({"scheduled": true, "executed": true, "raw": true}))
        .with_row("id056", json!({"scheduled": true, "executed": true, "raw": false}))
        .with_row("id057", json!({"scheduled": true, "executed": false, "raw": false}))
}

pub fn datahub() -> MockProvider {
    MockProvider::new("DataHubProvider", "datahub")
        .with_row("id055", json!({"inference": true, "reporting": false}))
}

/// Monitor definition reading sessions from an inline JSON export
pub struct CaptureMonitor {
    pub sessions: &'static str,
}

impl Default for CaptureMonitor {
    fn default() -> Self {
        Self {
            sessions: SESSIONS_JSON,
        }
    }
}

#[async_trait]
impl MonitorDefinition for CaptureMonitor {
    fn name(&self) -> &str {
        "capture"
    }

    async fn load_records(&self) -> anyhow::Result<Vec<SessionRecord>> {
        Ok(parse_sessions(self.sessions)?)
    }

    fn providers(&self) -> Vec<Arc<dyn Provider>> {
        vec![Arc::new(datalake()), Arc::new(datahub())]
    }

    fn rule_trees(&self) -> Result<Vec<RuleTree>, RuntimeError> {
        Ok(vec![RuleTree::new(capture_stages())?])
    }
}
