//! Read-only aggregation over session records.
//!
//! Reporting never mutates: it filters a snapshot and derives counts.
//! Open sessions count as views but contribute no duration — their length
//! is unknown until (unless) they close.

use super::model::{AccessSession, ViewerIdentity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Filters applied before aggregation. All optional; time bounds apply to
/// the session start.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub document_id: Option<String>,
    pub viewer: Option<ViewerIdentity>,
}

impl SessionFilter {
    pub fn matches(&self, session: &AccessSession) -> bool {
        if let Some(from) = self.from {
            if session.started_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if session.started_at > to {
                return false;
            }
        }
        if let Some(document_id) = &self.document_id {
            if &session.document_id != document_id {
                return false;
            }
        }
        if let Some(viewer) = &self.viewer {
            if &session.viewer != viewer {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewReport {
    pub total_views: u64,
    pub unique_documents: u64,
    pub authenticated_viewers: u64,
    pub anonymous_viewers: u64,
    /// Mean of closed-session durations; `None` when nothing has closed.
    pub average_duration_secs: Option<f64>,
    pub max_duration_secs: Option<i64>,
}

/// Aggregate `sessions` under `filter`.
pub fn summarize(sessions: &[AccessSession], filter: &SessionFilter) -> ViewReport {
    let mut total_views = 0u64;
    let mut documents = HashSet::new();
    let mut authenticated = HashSet::new();
    let mut anonymous = HashSet::new();
    let mut durations = Vec::new();

    for session in sessions.iter().filter(|s| filter.matches(s)) {
        total_views += 1;
        documents.insert(session.document_id.as_str());
        match &session.viewer {
            ViewerIdentity::User(id) => {
                authenticated.insert(id.as_str());
            }
            ViewerIdentity::Visitor(token) => {
                anonymous.insert(token.as_str());
            }
        }
        if let Some(duration) = session.duration_secs {
            durations.push(duration);
        }
    }

    let average_duration_secs = if durations.is_empty() {
        None
    } else {
        Some(durations.iter().sum::<i64>() as f64 / durations.len() as f64)
    };

    ViewReport {
        total_views,
        unique_documents: documents.len() as u64,
        authenticated_viewers: authenticated.len() as u64,
        anonymous_viewers: anonymous.len() as u64,
        average_duration_secs,
        max_duration_secs: durations.iter().max().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::geo::GeoLocation;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    fn session(
        document: &str,
        viewer: ViewerIdentity,
        start: i64,
        duration: Option<i64>,
    ) -> AccessSession {
        let mut session =
            AccessSession::begin(document, viewer, at(start), "agent", GeoLocation::Unknown);
        if let Some(secs) = duration {
            session.close(at(start + secs), None);
        }
        session
    }

    fn fixture() -> Vec<AccessSession> {
        vec![
            session("doc-1", ViewerIdentity::User("alice".into()), 0, Some(30)),
            session("doc-1", ViewerIdentity::User("bob".into()), 100, Some(60)),
            session("doc-2", ViewerIdentity::User("alice".into()), 200, Some(90)),
            session("doc-2", ViewerIdentity::Visitor("tok-1".into()), 300, None),
        ]
    }

    #[test]
    fn test_unfiltered_summary() {
        let report = summarize(&fixture(), &SessionFilter::default());
        assert_eq!(report.total_views, 4);
        assert_eq!(report.unique_documents, 2);
        assert_eq!(report.authenticated_viewers, 2);
        assert_eq!(report.anonymous_viewers, 1);
        assert_eq!(report.average_duration_secs, Some(60.0));
        assert_eq!(report.max_duration_secs, Some(90));
    }

    #[test]
    fn test_open_sessions_count_views_but_not_duration() {
        let sessions = vec![session(
            "doc-1",
            ViewerIdentity::Visitor("tok".into()),
            0,
            None,
        )];
        let report = summarize(&sessions, &SessionFilter::default());
        assert_eq!(report.total_views, 1);
        assert_eq!(report.average_duration_secs, None);
        assert_eq!(report.max_duration_secs, None);
    }

    #[test]
    fn test_document_filter() {
        let filter = SessionFilter {
            document_id: Some("doc-1".to_string()),
            ..SessionFilter::default()
        };
        let report = summarize(&fixture(), &filter);
        assert_eq!(report.total_views, 2);
        assert_eq!(report.unique_documents, 1);
        assert_eq!(report.max_duration_secs, Some(60));
    }

    #[test]
    fn test_viewer_filter() {
        let filter = SessionFilter {
            viewer: Some(ViewerIdentity::User("alice".into())),
            ..SessionFilter::default()
        };
        let report = summarize(&fixture(), &filter);
        assert_eq!(report.total_views, 2);
        assert_eq!(report.unique_documents, 2);
        assert_eq!(report.anonymous_viewers, 0);
    }

    #[test]
    fn test_time_range_filter_is_inclusive_on_start() {
        let filter = SessionFilter {
            from: Some(at(100)),
            to: Some(at(200)),
            ..SessionFilter::default()
        };
        let report = summarize(&fixture(), &filter);
        // Sessions starting at 100 and 200 are in; 0 and 300 are out.
        assert_eq!(report.total_views, 2);
    }

    #[test]
    fn test_empty_input_yields_zero_report() {
        let report = summarize(&[], &SessionFilter::default());
        assert_eq!(report.total_views, 0);
        assert_eq!(report.unique_documents, 0);
        assert_eq!(report.average_duration_secs, None);
    }
}
