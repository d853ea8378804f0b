//! Session input parsing
//!
//! Monitors that read their sessions from a warehouse export receive them as
//! a JSON array of `{participant_id, capture_date, capture_time}` objects.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use yieldwatch_core::{CoreError, SessionRecord};

/// One session as it appears in JSON input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSpec {
    pub participant_id: String,
    pub capture_date: String,
    pub capture_time: String,
}

impl SessionSpec {
    pub fn new(
        participant_id: impl Into<String>,
        capture_date: impl Into<String>,
        capture_time: impl Into<String>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            capture_date: capture_date.into(),
            capture_time: capture_time.into(),
        }
    }
}

impl TryFrom<SessionSpec> for SessionRecord {
    type Error = CoreError;

    fn try_from(spec: SessionSpec) -> std::result::Result<Self, Self::Error> {
        SessionRecord::new(spec.participant_id, spec.capture_date, spec.capture_time)
    }
}

impl From<&SessionRecord> for SessionSpec {
    fn from(record: &SessionRecord) -> Self {
        Self::new(
            record.participant_id(),
            record.capture_date(),
            record.capture_time(),
        )
    }
}

/// Parse a JSON array of sessions into validated records
///
/// The whole input is rejected if any session fails validation.
pub fn parse_sessions(json: &str) -> Result<Vec<SessionRecord>> {
    let specs: Vec<SessionSpec> = serde_json::from_str(json)?;
    let records = specs
        .into_iter()
        .map(SessionRecord::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    tracing::debug!("Parsed {} sessions", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;

    #[test]
    fn test_parse_sessions() {
        let json = r#"[
            {"participant_id": "id055", "capture_date": "20240104", "capture_time": "0945"},
            {"participant_id": "id056", "capture_date": "20240104", "capture_time": "1015"}
        ]"#;

        let records = parse_sessions(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].participant_id(), "id055");
        assert_eq!(records[1].capture_time(), "1015");
        assert_eq!(records[0].study_key(), "study_id055_20240104");
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_sessions("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse_sessions("{not json").unwrap_err();
        assert!(matches!(err, SdkError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let json = r#"[{"participant_id": "id055", "capture_date": "20240104"}]"#;
        assert!(matches!(parse_sessions(json), Err(SdkError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_invalid_session() {
        let json = r#"[
            {"participant_id": "id055", "capture_date": "20241304", "capture_time": "0945"}
        ]"#;
        let err = parse_sessions(json).unwrap_err();
        assert!(matches!(err, SdkError::Core(_)));
    }

    #[test]
    fn test_spec_from_record() {
        let record = SessionRecord::new("id055", "20240104", "0945").unwrap();
        let spec = SessionSpec::from(&record);
        assert_eq!(spec, SessionSpec::new("id055", "20240104", "0945"));
    }
}
