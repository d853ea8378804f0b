//! Concurrent, fault-isolated enrichment
//!
//! Every provider is spawned as its own task and receives the full batch.
//! The enricher waits for all of them before returning; dropping the
//! enrichment future aborts the providers still running. A provider that
//! returns an error, panics or exceeds the configured timeout never affects
//! the other providers. Its task appends a `provider_crash` error to every
//! record of the batch at the moment it fails.

use crate::error::panic_message;
use crate::provider::Provider;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use yieldwatch_core::{ErrorRecord, SessionRecord};

/// A batch of session records shared between provider tasks
pub type RecordBatch = Arc<[SessionRecord]>;

/// A provider that did not complete successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Provider name
    pub provider: String,

    /// Failure description as written into the crash errors
    pub description: String,
}

/// Which providers completed and which failed during one enrichment pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Providers that completed, in configuration order
    pub succeeded: Vec<String>,

    /// Providers that failed, in configuration order
    pub failed: Vec<ProviderFailure>,
}

impl EnrichmentSummary {
    /// True when no provider failed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs providers against a batch of records
pub struct Enricher {
    providers: Vec<Arc<dyn Provider>>,
    provider_timeout: Option<Duration>,
}

impl Enricher {
    /// Create a new enricher
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            provider_timeout: None,
        }
    }

    /// Treat a provider running longer than `timeout` as failed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    /// Add a provider
    pub fn add_provider(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    /// Configured providers
    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Configured per-provider timeout
    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout
    }

    /// Run all providers and return the same batch
    ///
    /// Must be called from within a tokio runtime.
    pub async fn enrich(&self, records: RecordBatch) -> RecordBatch {
        self.enrich_with_summary(&records).await;
        records
    }

    /// Run all providers and report which of them failed
    pub async fn enrich_with_summary(&self, records: &RecordBatch) -> EnrichmentSummary {
        let mut summary = EnrichmentSummary::default();

        if self.providers.is_empty() || records.is_empty() {
            debug!(
                providers = self.providers.len(),
                records = records.len(),
                "Nothing to enrich"
            );
            return summary;
        }

        info!(
            "Running {} providers against {} records",
            self.providers.len(),
            records.len()
        );

        // Dropping the set aborts every provider still running
        let mut tasks = JoinSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            let provider = Arc::clone(provider);
            let batch = Arc::clone(records);
            let timeout = self.provider_timeout;

            tasks.spawn(async move {
                let result = run_provider(provider.as_ref(), &batch, timeout).await;
                if let Err(description) = &result {
                    flag_batch(provider.name(), description, &batch);
                }
                (index, result)
            });
        }

        let mut results: Vec<Option<std::result::Result<(), String>>> =
            vec![None; self.providers.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(join_error) => error!("Provider task did not complete: {}", join_error),
            }
        }

        for (provider, result) in self.providers.iter().zip(results) {
            let name = provider.name().to_string();
            let description = match result {
                Some(Ok(())) => {
                    summary.succeeded.push(name);
                    continue;
                }
                Some(Err(description)) => description,
                None => {
                    let description = "task aborted".to_string();
                    flag_batch(&name, &description, records);
                    description
                }
            };

            summary.failed.push(ProviderFailure {
                provider: name,
                description,
            });
        }

        summary
    }
}

/// Record a whole-provider failure on every record of the batch
fn flag_batch(provider: &str, description: &str, records: &[SessionRecord]) {
    error!("Provider '{}' failed with error: {}", provider, description);
    for record in records {
        record.push_error(ErrorRecord::provider_crash(provider, description));
    }
}

async fn run_provider(
    provider: &dyn Provider,
    records: &[SessionRecord],
    timeout: Option<Duration>,
) -> std::result::Result<(), String> {
    debug!("Starting provider '{}'", provider.name());

    let run = AssertUnwindSafe(provider.apply(records)).catch_unwind();
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => return Err(format!("timed out after {:?}", limit)),
        },
        None => run.await,
    };

    match result {
        Ok(Ok(())) => {
            debug!("Provider '{}' completed successfully", provider.name());
            Ok(())
        }
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(&*payload))),
    }
}
