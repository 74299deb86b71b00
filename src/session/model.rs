//! Access session records and viewer identity.

use super::geo::GeoLocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is looking at a document.
///
/// An authenticated user id wins when present; otherwise the client-supplied
/// anonymous visitor token identifies the session. The two are never merged
/// for the same human — an anonymous history stays anonymous after login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ViewerIdentity {
    User(String),
    Visitor(String),
}

impl ViewerIdentity {
    /// Resolve identity from request parts: user id when present, else the
    /// visitor token, else nothing to correlate on.
    pub fn from_parts(user_id: Option<&str>, visitor_token: Option<&str>) -> Option<Self> {
        match (user_id, visitor_token) {
            (Some(user), _) if !user.is_empty() => Some(Self::User(user.to_string())),
            (_, Some(token)) if !token.is_empty() => Some(Self::Visitor(token.to_string())),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Self::User(id) | Self::Visitor(id) => id,
        }
    }

    /// Path-safe segment for storage keys; the `u-`/`v-` prefix keeps user
    /// ids and visitor tokens in disjoint namespaces.
    pub fn storage_slug(&self) -> String {
        let (prefix, id) = match self {
            Self::User(id) => ("u", id),
            Self::Visitor(id) => ("v", id),
        };
        let safe: String = id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}-{}", prefix, safe)
    }
}

impl std::fmt::Display for ViewerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Visitor(id) => write!(f, "visitor:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// One continuous viewing interval of one document by one viewer.
///
/// Created on the `opened` signal, mutated exactly once on `closed` (or on
/// the defensive auto-close), never deleted here — retention is external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessSession {
    pub id: Uuid,
    pub document_id: String,
    pub viewer: ViewerIdentity,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Server-computed whole seconds between start and end, rounded.
    pub duration_secs: Option<i64>,
    pub user_agent: String,
    pub location: GeoLocation,
    /// Duration the client claims it measured; kept as a cross-check only,
    /// the server delta is authoritative.
    pub client_reported_secs: Option<u64>,
}

impl AccessSession {
    pub fn begin(
        document_id: impl Into<String>,
        viewer: ViewerIdentity,
        started_at: DateTime<Utc>,
        user_agent: impl Into<String>,
        location: GeoLocation,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            viewer,
            started_at,
            ended_at: None,
            duration_secs: None,
            user_agent: user_agent.into(),
            location,
            client_reported_secs: None,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.ended_at.is_some() {
            SessionState::Closed
        } else {
            SessionState::Open
        }
    }

    /// Transition to Closed: set the end, compute the rounded duration.
    pub(crate) fn close(&mut self, at: DateTime<Utc>, client_reported_secs: Option<u64>) {
        let millis = (at - self.started_at).num_milliseconds();
        self.ended_at = Some(at);
        self.duration_secs = Some(((millis as f64) / 1000.0).round() as i64);
        if client_reported_secs.is_some() {
            self.client_reported_secs = client_reported_secs;
        }
    }
}
