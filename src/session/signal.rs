//! Wire contract for client viewing signals.
//!
//! The viewing client emits two event types, `opened` and `closed`,
//! typically driven by tab visibility. Delivery is best-effort: signals can
//! be late, duplicated, re-ordered, or never arrive, and the tracker is
//! built to tolerate all of that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Opened,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSignal {
    pub event: SignalKind,

    pub document_id: String,

    /// Anonymous visitor token; absent when the caller is authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_token: Option<String>,

    /// Event time in unix milliseconds.
    pub timestamp_millis: i64,

    pub user_agent: String,

    /// Client-computed duration, only on `closed`; cross-check, not truth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

impl ViewSignal {
    /// The carried timestamp as a UTC instant; `None` when the value falls
    /// outside the representable range (a hostile or broken client).
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opened_signal_deserializes_from_wire_form() {
        let json = r#"{
            "event": "opened",
            "documentId": "doc-1",
            "viewerToken": "tok-abc",
            "timestampMillis": 1000,
            "userAgent": "Mozilla/5.0"
        }"#;
        let signal: ViewSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.event, SignalKind::Opened);
        assert_eq!(signal.document_id, "doc-1");
        assert_eq!(signal.viewer_token.as_deref(), Some("tok-abc"));
        assert_eq!(signal.duration_seconds, None);
        assert_eq!(signal.event_time().unwrap().timestamp(), 1);
    }

    #[test]
    fn test_closed_signal_carries_client_duration() {
        let json = r#"{
            "event": "closed",
            "documentId": "doc-1",
            "timestampMillis": 31000,
            "userAgent": "Mozilla/5.0",
            "durationSeconds": 30
        }"#;
        let signal: ViewSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.event, SignalKind::Closed);
        assert_eq!(signal.duration_seconds, Some(30));
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let signal = ViewSignal {
            event: SignalKind::Opened,
            document_id: "doc-1".to_string(),
            viewer_token: None,
            timestamp_millis: 5,
            user_agent: "ua".to_string(),
            duration_seconds: None,
        };
        let json = serde_json::to_string(&signal).unwrap();
        assert!(json.contains("\"documentId\""));
        assert!(json.contains("\"timestampMillis\""));
        // Absent optionals are omitted on the wire
        assert!(!json.contains("viewerToken"));
        assert!(!json.contains("durationSeconds"));
    }

    #[test]
    fn test_unrepresentable_timestamp_yields_none() {
        let signal = ViewSignal {
            event: SignalKind::Opened,
            document_id: "doc-1".to_string(),
            viewer_token: None,
            timestamp_millis: i64::MAX,
            user_agent: "ua".to_string(),
            duration_seconds: None,
        };
        assert!(signal.event_time().is_none());
    }
}
