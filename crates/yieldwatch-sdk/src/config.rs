//! Configuration types for YieldMonitor

use crate::error::{Result, SdkError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use yieldwatch_runtime::report::{DEFAULT_METADATA_KEYS, RESERVED_RESULT_KEYS};

/// Default configuration file, looked up without extension
pub const DEFAULT_CONFIG_FILE: &str = "config/yieldwatch";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "YIELDWATCH";

/// Main monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Per-provider timeout in milliseconds; unset means wait forever
    pub provider_timeout_ms: Option<u64>,

    /// Report configuration
    pub report: ReportConfig,

    /// Log level used when no `RUST_LOG` filter is set
    pub log_level: String,
}

/// Report configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Metadata keys copied into each study's results
    pub metadata_keys: Vec<String>,

    /// Produce the Sankey flow summary
    pub include_flow_summary: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            metadata_keys: DEFAULT_METADATA_KEYS.iter().map(|k| k.to_string()).collect(),
            include_flow_summary: true,
        }
    }
}

impl MonitorConfig {
    /// Create a new monitor configuration
    pub fn new() -> Self {
        Self {
            provider_timeout_ms: None,
            report: ReportConfig::default(),
            log_level: "info".to_string(),
        }
    }

    /// Set the per-provider timeout
    ///
    /// Sub-millisecond timeouts round up to one millisecond; a zero timeout
    /// is kept and rejected by [`validate`](Self::validate).
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 && !timeout.is_zero() {
            millis = 1;
        }
        self.provider_timeout_ms = Some(millis);
        self
    }

    /// Set the metadata keys copied into reports
    pub fn with_metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.report.metadata_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the flow summary
    pub fn include_flow_summary(mut self, include: bool) -> Self {
        self.report.include_flow_summary = include;
        self
    }

    /// Set the log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Per-provider timeout
    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_ms.map(Duration::from_millis)
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> Result<()> {
        if self.provider_timeout_ms == Some(0) {
            return Err(SdkError::Config(
                "provider_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.report.metadata_keys.iter().any(|k| k.is_empty()) {
            return Err(SdkError::Config(
                "report.metadata_keys must not contain empty keys".to_string(),
            ));
        }
        if let Some(key) = self
            .report
            .metadata_keys
            .iter()
            .find(|k| RESERVED_RESULT_KEYS.contains(&k.as_str()))
        {
            return Err(SdkError::Config(format!(
                "report.metadata_keys must not use the reserved result field '{}'",
                key
            )));
        }
        Ok(())
    }

    /// Load configuration from `.env`, the default config file and the environment
    pub fn load() -> Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file (optional) and the environment
    ///
    /// Environment variables use the `YIELDWATCH_` prefix and `__` to reach
    /// nested fields, e.g. `YIELDWATCH_REPORT__INCLUDE_FLOW_SUMMARY=false`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("report.metadata_keys"),
            )
            .build()
            .map_err(|e| SdkError::Config(format!("Failed to read configuration: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| SdkError::Config(format!("Failed to deserialize config: {}", e)))?;

        config.validate()?;
        tracing::debug!("Loaded monitor configuration: {:?}", config);
        Ok(config)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}
