//! Template variable substitution for stamp text.
//!
//! The configured stamp template is resolved once per request into the text
//! tiled across the document, e.g. `"{{viewer}} · {{date}}"` becomes
//! `"alice@example.com · 2026-08-06"`.
//!
//! # Supported Variables
//!
//! - `{{viewer}}` - viewer label (user id or visitor token)
//! - `{{document}}` - document display name
//! - `{{date}}` - request date (YYYY-MM-DD)
//! - `{{datetime}}` - ISO 8601 datetime of the request
//!
//! Unknown variables resolve to an empty string rather than failing: a
//! misconfigured template must not block document delivery.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Regex pattern for matching template variables: {{variable}}
static TEMPLATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn get_template_pattern() -> &'static Regex {
    TEMPLATE_PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([^}]+)\}\}").expect("Invalid template regex - this is a compile-time bug")
    })
}

/// Values available for stamp template substitution.
#[derive(Debug, Clone)]
pub struct StampContext {
    pub viewer: String,
    pub document: String,
    /// Request time; the caller supplies it so rendering stays clock-free.
    pub at: DateTime<Utc>,
}

/// Resolve all `{{variable}}` occurrences in `template`.
pub fn resolve_stamp(template: &str, context: &StampContext) -> String {
    get_template_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            match caps[1].trim() {
                "viewer" => context.viewer.clone(),
                "document" => context.document.clone(),
                "date" => context.at.format("%Y-%m-%d").to_string(),
                "datetime" => context.at.to_rfc3339(),
                _ => String::new(),
            }
        })
        .into_owned()
}
