//! Data provider abstraction
//!
//! A provider fetches data for a whole batch of session records from one
//! external source and writes it into each record's metadata under its own
//! key. Per-record problems are appended to the record's error list by the
//! provider itself; a provider only returns `Err` when the whole fetch
//! failed, in which case the [`Enricher`](crate::Enricher) flags every record.

use async_trait::async_trait;
use thiserror::Error;
use yieldwatch_core::SessionRecord;

/// Failure of a whole provider run
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The external source could not be reached
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The source answered but the query failed
    #[error("Query failed: {0}")]
    Query(String),

    /// The source returned data the provider could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Any other failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Data source capability consumed by the enricher
///
/// Implementations must only write their own metadata key(s) and append to
/// the shared error list; they must not depend on another provider having
/// run first.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable name used in error attribution and logging
    fn name(&self) -> &str;

    /// Enrich the full batch of records
    async fn apply(&self, records: &[SessionRecord]) -> Result<(), ProviderError>;
}
