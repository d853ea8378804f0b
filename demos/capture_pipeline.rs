//! Capture pipeline monitor demo
//!
//! Checks three capture sessions against the stage hierarchy
//! Scheduled -> Executed -> RawData -> [Inference, Reporting] using two
//! in-memory providers, then prints the JSON report.
//!
//! Run with: `cargo run --example capture_pipeline`
//! Configuration is read from `config/yieldwatch.*` and `YIELDWATCH_*`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yieldwatch_sdk::{
    parse_sessions, run_monitor, ErrorKind, ErrorRecord, MonitorConfig, MonitorDefinition,
    Provider, ProviderError, RuleError, RuleNode, RuleOutcome, RuleTree, RuntimeError,
    SessionRecord,
};

const SESSIONS: &str = r#"[
    {"participant_id": "id055", "capture_date": "20240104", "capture_time": "0945"},
    {"participant_id": "id056", "capture_date": "20240104", "capture_time": "1015"},
    {"participant_id": "id057", "capture_date": "20240105", "capture_time": "1730"}
]"#;

/// In-memory stand-in for a warehouse table keyed by participant
struct TableProvider {
    name: &'static str,
    key: &'static str,
    latency: Duration,
    rows: HashMap<&'static str, Value>,
}

#[async_trait]
impl Provider for TableProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn apply(&self, records: &[SessionRecord]) -> Result<(), ProviderError> {
        tokio::time::sleep(self.latency).await;
        for record in records {
            match self.rows.get(record.participant_id()) {
                Some(row) => record.set_metadata(self.key, row.clone()),
                None => record.push_error(ErrorRecord::new(
                    self.name,
                    format!("no {} rows for {}", self.key, record.participant_id()),
                    ErrorKind::MissingData,
                )),
            }
        }
        Ok(())
    }
}

fn datalake() -> TableProvider {
    TableProvider {
        name: "DataLakeProvider",
        key: "datalake",
        latency: Duration::from_millis(50),
        rows: HashMap::from([
            ("id055", json!({"scheduled": true, "executed": true, "files": 42})),
            ("id056", json!({"scheduled": true, "executed": true, "files": 0})),
            ("id057", json!({"scheduled": true, "executed": false, "files": 0})),
        ]),
    }
}

fn datahub() -> TableProvider {
    TableProvider {
        name: "DataHubProvider",
        key: "datahub",
        latency: Duration::from_millis(80),
        rows: HashMap::from([(
            "id055",
            json!({"inference": "complete", "report_url": "https://reports.local/id055"}),
        )]),
    }
}

fn flag(name: &str, key: &'static str, field: &'static str) -> RuleNode {
    RuleNode::from_fn(name, move |record: &SessionRecord| {
        let data = record
            .metadata(key)
            .ok_or_else(|| RuleError::MissingMetadata(key.to_string()))?;
        Ok(match data.get(field).and_then(Value::as_bool) {
            Some(true) => RuleOutcome::pass(),
            _ => RuleOutcome::fail(format!("{} not confirmed", field)),
        })
    })
}

fn raw_data() -> RuleNode {
    RuleNode::from_fn("RawData", |record: &SessionRecord| {
        let files = record
            .metadata("datalake")
            .and_then(|data| data.get("files").and_then(Value::as_u64))
            .ok_or_else(|| RuleError::InvalidData {
                field: "datalake.files".to_string(),
                detail: "expected a file count".to_string(),
            })?;
        let outcome = if files > 0 {
            RuleOutcome::pass()
        } else {
            RuleOutcome::fail("No raw files uploaded")
        };
        Ok(outcome.with_extra("files", files))
    })
}

fn inference() -> RuleNode {
    RuleNode::from_fn("Inference", |record: &SessionRecord| {
        let data = record
            .metadata("datahub")
            .ok_or_else(|| RuleError::MissingMetadata("datahub".to_string()))?;
        match data.get("inference").and_then(Value::as_str) {
            Some("complete") => Ok(RuleOutcome::pass()),
            Some(state) => Ok(RuleOutcome::fail(format!("Inference is {}", state))),
            None => Ok(RuleOutcome::fail("Inference not started")),
        }
    })
}

fn reporting() -> RuleNode {
    RuleNode::from_fn("Reporting", |record: &SessionRecord| {
        let url = record
            .metadata("datahub")
            .and_then(|data| data.get("report_url").cloned());
        Ok(match url {
            Some(url) => RuleOutcome::pass().with_extra("report_url", url),
            None => RuleOutcome::fail("No report published"),
        })
    })
}

struct CaptureMonitor;

#[async_trait]
impl MonitorDefinition for CaptureMonitor {
    fn name(&self) -> &str {
        "capture"
    }

    async fn load_records(&self) -> anyhow::Result<Vec<SessionRecord>> {
        Ok(parse_sessions(SESSIONS)?)
    }

    fn providers(&self) -> Vec<Arc<dyn Provider>> {
        vec![Arc::new(datalake()), Arc::new(datahub())]
    }

    fn rule_trees(&self) -> std::result::Result<Vec<RuleTree>, RuntimeError> {
        let stages = flag("Scheduled", "datalake", "scheduled").with_child(
            flag("Executed", "datalake", "executed")
                .with_child(raw_data().with_children([inference(), reporting()])),
        );
        Ok(vec![RuleTree::new(stages)?])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = MonitorConfig::load()?;
    init_tracing(&config.log_level)?;

    let report = run_monitor(&CaptureMonitor, config).await?;
    println!("{}", report.to_json_pretty()?);

    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "capture_pipeline={level},yieldwatch_sdk={level},yieldwatch_runtime={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
