//! Session records
//!
//! A [`SessionRecord`] identifies one capture session (participant, date and
//! time) and carries two side channels written by providers during
//! enrichment: an open metadata map keyed by provider namespace, and an
//! append-only list of [`ErrorRecord`]s.
//!
//! Both side channels sit behind per-record locks so that providers running
//! on separate tasks can write to the same batch at the same time.

use crate::error::{CoreError, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Category of an error attached to a session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A whole provider failed; written by the engine on every record
    ProviderCrash,

    /// A provider failed to fetch data for this particular record
    ProviderError,

    /// A provider ran but found no data for this record
    MissingData,
}

impl ErrorKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderCrash => "provider_crash",
            ErrorKind::ProviderError => "provider_error",
            ErrorKind::MissingData => "missing_data",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error entry on a session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Name of the provider (or engine component) that reported the error
    pub source: String,

    /// Human readable description
    pub error: String,

    /// Error category
    pub kind: ErrorKind,
}

impl ErrorRecord {
    /// Create a new error record
    pub fn new(source: impl Into<String>, error: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            source: source.into(),
            error: error.into(),
            kind,
        }
    }

    /// Error written by the engine when a whole provider fails
    pub fn provider_crash(source: impl Into<String>, description: impl fmt::Display) -> Self {
        Self::new(
            source,
            format!("Provider failed: {}", description),
            ErrorKind::ProviderCrash,
        )
    }
}

/// A single capture session flowing through the monitor
pub struct SessionRecord {
    participant_id: String,
    capture_date: String,
    capture_time: String,
    metadata: RwLock<BTreeMap<String, Value>>,
    errors: Mutex<Vec<ErrorRecord>>,
}

impl SessionRecord {
    /// Create a validated session record
    ///
    /// `capture_date` must be `YYYYMMDD` and `capture_time` must be `HHMM`
    /// (24h clock).
    pub fn new(
        participant_id: impl Into<String>,
        capture_date: impl Into<String>,
        capture_time: impl Into<String>,
    ) -> Result<Self> {
        let capture_date = capture_date.into();
        let capture_time = capture_time.into();

        validate_capture_date(&capture_date)?;
        validate_capture_time(&capture_time)?;

        Ok(Self {
            participant_id: participant_id.into(),
            capture_date,
            capture_time,
            metadata: RwLock::new(BTreeMap::new()),
            errors: Mutex::new(Vec::new()),
        })
    }

    /// Participant identifier (e.g. `ABC123`)
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Capture date in `YYYYMMDD` form
    pub fn capture_date(&self) -> &str {
        &self.capture_date
    }

    /// Capture time in `HHMM` form
    pub fn capture_time(&self) -> &str {
        &self.capture_time
    }

    /// Key identifying this session in outcome maps and reports
    pub fn study_key(&self) -> String {
        format!("study_{}_{}", self.participant_id, self.capture_date)
    }

    /// Store provider data under `key`, replacing any previous value
    pub fn set_metadata(&self, key: impl Into<String>, value: Value) {
        self.metadata.write().insert(key.into(), value);
    }

    /// Get a copy of the provider data stored under `key`
    pub fn metadata(&self, key: &str) -> Option<Value> {
        self.metadata.read().get(key).cloned()
    }

    /// Check whether any provider wrote data under `key`
    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.read().contains_key(key)
    }

    /// Copy of the whole metadata map
    pub fn metadata_snapshot(&self) -> BTreeMap<String, Value> {
        self.metadata.read().clone()
    }

    /// Append an error entry
    pub fn push_error(&self, error: ErrorRecord) {
        self.errors.lock().push(error);
    }

    /// Copy of the error entries, in the order they were appended
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.lock().clone()
    }

    /// Check whether any error has been recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.lock().is_empty()
    }
}

impl Clone for SessionRecord {
    fn clone(&self) -> Self {
        Self {
            participant_id: self.participant_id.clone(),
            capture_date: self.capture_date.clone(),
            capture_time: self.capture_time.clone(),
            metadata: RwLock::new(self.metadata_snapshot()),
            errors: Mutex::new(self.errors()),
        }
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("participant_id", &self.participant_id)
            .field("capture_date", &self.capture_date)
            .field("capture_time", &self.capture_time)
            .field("metadata", &*self.metadata.read())
            .field("errors", &*self.errors.lock())
            .finish()
    }
}

impl PartialEq for SessionRecord {
    fn eq(&self, other: &Self) -> bool {
        self.participant_id == other.participant_id
            && self.capture_date == other.capture_date
            && self.capture_time == other.capture_time
    }
}

impl Eq for SessionRecord {}

impl Hash for SessionRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.participant_id.hash(state);
        self.capture_date.hash(state);
        self.capture_time.hash(state);
    }
}

/// Validate a `YYYYMMDD` capture date
pub fn validate_capture_date(date: &str) -> Result<()> {
    if !is_digits(date, 8) {
        return Err(CoreError::InvalidCaptureDate(format!(
            "capture_date must be in YYYYMMDD format, got: '{}'",
            date
        )));
    }

    let month = two_digits(&date[4..6]);
    if !(1..=12).contains(&month) {
        return Err(CoreError::InvalidCaptureDate(format!(
            "capture_date month must be 01-12, got: '{}'",
            &date[4..6]
        )));
    }

    let day = two_digits(&date[6..8]);
    if !(1..=31).contains(&day) {
        return Err(CoreError::InvalidCaptureDate(format!(
            "capture_date day must be 01-31, got: '{}'",
            &date[6..8]
        )));
    }

    Ok(())
}

/// Validate an `HHMM` capture time
pub fn validate_capture_time(time: &str) -> Result<()> {
    if !is_digits(time, 4) {
        return Err(CoreError::InvalidCaptureTime(format!(
            "capture_time must be in HHMM format, got: '{}'",
            time
        )));
    }

    if two_digits(&time[..2]) > 23 {
        return Err(CoreError::InvalidCaptureTime(format!(
            "capture_time hour must be 00-23, got: '{}'",
            &time[..2]
        )));
    }

    if two_digits(&time[2..4]) > 59 {
        return Err(CoreError::InvalidCaptureTime(format!(
            "capture_time minute must be 00-59, got: '{}'",
            &time[2..4]
        )));
    }

    Ok(())
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

// Caller guarantees two ASCII digits.
fn two_digits(s: &str) -> u32 {
    s.bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
}
