//! Watermark error types.

use std::fmt;

/// Errors that can occur while producing a stamped derivative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    /// The input could not be decoded as the expected container format.
    /// Distinct from the integrity gate: a corrupt-but-plausible document
    /// passes validation and can still fail here.
    RenderFailure(String),

    /// Stamp style is unusable (opacity out of range, empty text, ...).
    InvalidStyle(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenderFailure(msg) => write!(f, "Failed to render watermark: {}", msg),
            Self::InvalidStyle(msg) => write!(f, "Invalid stamp style: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
