//! Storage key layout.
//!
//! Originals and generated derivatives live under separate prefixes;
//! derivative keys additionally carry the viewer slug plus a timestamp and a
//! random token, so no two requests — even for the same viewer in the same
//! millisecond — collide on a key.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Key prefixes, configurable so operators can map them onto bucket layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    originals_prefix: String,
    derivatives_prefix: String,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::new("originals", "derivatives")
    }
}

impl KeyLayout {
    pub fn new(originals_prefix: impl Into<String>, derivatives_prefix: impl Into<String>) -> Self {
        Self {
            originals_prefix: originals_prefix.into(),
            derivatives_prefix: derivatives_prefix.into(),
        }
    }

    /// Key of a document's immutable original.
    pub fn original(&self, document_id: &str) -> String {
        format!("{}/{}", self.originals_prefix, sanitize(document_id))
    }

    /// Key for a freshly generated derivative. Unique per call: the viewer
    /// slug separates viewers, the timestamp separates requests over time,
    /// and the random token separates concurrent requests by one viewer.
    pub fn derivative(&self, document_id: &str, viewer_slug: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}/{}-{}.pdf",
            self.derivatives_prefix,
            sanitize(document_id),
            viewer_slug,
            at.timestamp_millis(),
            Uuid::new_v4().simple(),
        )
    }

    /// Prefix under which every derivative of a document lives.
    pub fn derivatives_of(&self, document_id: &str) -> String {
        format!("{}/{}/", self.derivatives_prefix, sanitize(document_id))
    }
}

/// Keep key segments path-safe: alphanumerics plus `.`, `-`, `_`; anything
/// else becomes `-`.
fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
