//! Crate-level error type for the delivery pipeline.
//!
//! Session-tracking errors are deliberately absent: tracking is best-effort
//! telemetry, logged at the pipeline boundary and never surfaced to the
//! viewing client.

use crate::integrity::IntegrityError;
use crate::store::StorageError;
use crate::watermark::WatermarkError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The authorization collaborator declined the request.
    #[error("viewer is not authorized to access this document")]
    Unauthorized,

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions_preserve_source_message() {
        let err: DeliveryError = IntegrityError::MalformedHeader.into();
        assert!(matches!(err, DeliveryError::Integrity(_)));

        let err: DeliveryError = WatermarkError::RenderFailure("x".to_string()).into();
        assert_eq!(err.to_string(), "Failed to render watermark: x");

        let err: DeliveryError = StorageError::NotFound("k".to_string()).into();
        assert_eq!(err.to_string(), "no object stored under key 'k'");
    }
}
