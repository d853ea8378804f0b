//! Common test utilities for runtime integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use yieldwatch_core::{ErrorKind, ErrorRecord, RuleOutcome, SessionRecord};
use yieldwatch_runtime::{Provider, ProviderError, RuleError, RuleNode};

/// Provider that serves per-participant stage data from a fixed table
///
/// Participants missing from the table get a `missing_data` error.
pub struct TableProvider {
    name: String,
    key: String,
    rows: HashMap<String, Value>,
}

impl TableProvider {
    pub fn new(name: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            rows: HashMap::new(),
        }
    }

    pub fn with_row(mut self, participant: &str, row: Value) -> Self {
        self.rows.insert(participant.to_string(), row);
        self
    }
}

#[async_trait]
impl Provider for TableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, records: &[SessionRecord]) -> Result<(), ProviderError> {
        tokio::task::yield_now().await;
        for record in records {
            match self.rows.get(record.participant_id()) {
                Some(row) => record.set_metadata(self.key.as_str(), row.clone()),
                None => record.push_error(ErrorRecord::new(
                    self.name.as_str(),
                    format!("no row for {}", record.participant_id()),
                    ErrorKind::MissingData,
                )),
            }
        }
        Ok(())
    }
}

/// Provider whose whole fetch fails
pub struct OfflineProvider;

#[async_trait]
impl Provider for OfflineProvider {
    fn name(&self) -> &str {
        "offline"
    }

    async fn apply(&self, _records: &[SessionRecord]) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable("warehouse offline".to_string()))
    }
}

/// Node passing when `metadata[key][field] == "done"`
pub fn stage_rule(name: &str, key: &'static str, field: &'static str) -> RuleNode {
    RuleNode::from_fn(name, move |record: &SessionRecord| {
        let data = record
            .metadata(key)
            .ok_or_else(|| RuleError::MissingMetadata(key.to_string()))?;
        match data.get(field).and_then(Value::as_str) {
            Some("done") => Ok(RuleOutcome::pass()),
            Some(other) => Ok(RuleOutcome::fail(format!("{} is {}", field, other))),
            None => Ok(RuleOutcome::fail(format!("{} not reported", field))),
        }
    })
}

pub fn record(participant: &str) -> SessionRecord {
    SessionRecord::new(participant, "20250112", "1430").expect("valid record")
}

pub fn stage_row(scheduled: &str, executed: &str, raw: &str) -> Value {
    json!({
        "scheduled": scheduled,
        "executed": executed,
        "raw": raw,
    })
}

/// Small deterministic generator for shaping test trees
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}
