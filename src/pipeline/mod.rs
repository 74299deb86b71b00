//! Delivery pipeline: the end-to-end path from access request to signed URL.
//!
//! Control flow per request: notify the session tracker ("opened") →
//! authorize → load and validate the stored original → render the
//! viewer-specific stamp → persist the derivative → issue a time-boxed URL.
//! Each request is independent: concurrent viewers of one document share no
//! mutable state and never share a derivative key.

use crate::clock::Clock;
use crate::error::DeliveryError;
use crate::integrity;
use crate::session::{AccessTracker, ViewSignal, ViewerIdentity};
use crate::store::DerivativeStore;
use crate::watermark::{resolve_stamp, StampContext, StampStyle, WatermarkError, WatermarkRenderer};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(test)]
use mockall::automock;

/// Authorization collaborator. Opaque to the core; called exactly once per
/// request, before any rendering work.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn can_access(&self, viewer: &ViewerIdentity, document_id: &str) -> bool;
}

/// Document attributes supplied by the external CRUD collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub tenant_id: String,
}

/// One viewer's request to see one document.
#[derive(Debug, Clone)]
pub struct ViewRequest {
    pub document: DocumentMeta,
    pub viewer: ViewerIdentity,
    pub user_agent: String,
    pub remote_addr: Option<IpAddr>,
}

/// Response for a freshly rendered derivative. The URL is only valid for
/// the store's configured TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredDocument {
    pub url: String,
    pub name: String,
    /// Size of the derivative (not the original; stamping changes it).
    pub size: u64,
    pub mime_type: String,
}

pub struct DeliveryPipeline {
    gate: Arc<dyn AccessGate>,
    store: Arc<DerivativeStore>,
    tracker: Arc<AccessTracker>,
    renderer: WatermarkRenderer,
    clock: Arc<dyn Clock>,
    stamp_template: String,
    style: StampStyle,
}

impl DeliveryPipeline {
    pub fn new(
        gate: Arc<dyn AccessGate>,
        store: Arc<DerivativeStore>,
        tracker: Arc<AccessTracker>,
        clock: Arc<dyn Clock>,
        stamp_template: impl Into<String>,
        style: StampStyle,
    ) -> Self {
        Self {
            gate,
            store,
            tracker,
            renderer: WatermarkRenderer::new(),
            clock,
            stamp_template: stamp_template.into(),
            style,
        }
    }

    pub fn tracker(&self) -> &AccessTracker {
        &self.tracker
    }

    /// Validate and persist a freshly uploaded original.
    pub async fn upload(&self, meta: &DocumentMeta, bytes: Bytes) -> Result<String, DeliveryError> {
        integrity::validate(&bytes)?;
        let key = self.store.store_original(&meta.id, bytes).await?;
        info!(document_id = %meta.id, key = %key, "original stored");
        Ok(key)
    }

    /// Deliver a watermarked derivative for one view request.
    pub async fn deliver(&self, request: ViewRequest) -> Result<DeliveredDocument, DeliveryError> {
        let ViewRequest {
            document,
            viewer,
            user_agent,
            remote_addr,
        } = request;
        let now = self.clock.now();

        // Telemetry first: the viewer has opened the document, whatever
        // happens to the render. A failed request still counts as a view
        // attempt and the auto-close invariant must see this open.
        self.tracker
            .record_opened(&document.id, viewer.clone(), now, &user_agent, remote_addr);

        if !self.gate.can_access(&viewer, &document.id).await {
            return Err(DeliveryError::Unauthorized);
        }

        let original = self.store.load_original(&document.id).await?;
        integrity::validate(&original)?;

        let stamp = resolve_stamp(
            &self.stamp_template,
            &StampContext {
                viewer: viewer.label().to_string(),
                document: document.name.clone(),
                at: now,
            },
        );

        // Page stamping is CPU work; keep it off the async executor.
        let renderer = self.renderer;
        let style = self.style.clone();
        let stamped =
            tokio::task::spawn_blocking(move || renderer.render(&original, &stamp, &style))
                .await
                .map_err(|e| {
                    DeliveryError::Watermark(WatermarkError::RenderFailure(format!(
                        "render task failed: {}",
                        e
                    )))
                })??;

        let size = stamped.len() as u64;
        let key = self
            .store
            .store_derivative(&document.id, &viewer.storage_slug(), Bytes::from(stamped))
            .await?;
        let url = self.store.issue_url(&key);

        info!(
            document_id = %document.id,
            viewer = %viewer,
            key = %key,
            size,
            "derivative delivered"
        );

        Ok(DeliveredDocument {
            url,
            name: document.name,
            size,
            mime_type: document.mime_type,
        })
    }

    /// Ingest a wire signal from the viewing client. Never fails the
    /// caller: tracking errors are logged and discarded.
    pub fn ingest_signal(
        &self,
        signal: &ViewSignal,
        authenticated_user: Option<&str>,
        remote_addr: Option<IpAddr>,
    ) {
        let viewer =
            match ViewerIdentity::from_parts(authenticated_user, signal.viewer_token.as_deref()) {
                Some(viewer) => viewer,
                None => {
                    warn!(
                        document_id = %signal.document_id,
                        "discarding signal with no correlatable viewer identity"
                    );
                    return;
                }
            };

        if let Err(err) = self.tracker.apply_signal(signal, viewer, remote_addr) {
            warn!(
                document_id = %signal.document_id,
                error = %err,
                "session signal discarded"
            );
        }
    }

    /// Remove a document's original and all derivatives.
    pub async fn remove_document(&self, document_id: &str) -> Result<u64, DeliveryError> {
        Ok(self.store.remove_document(document_id).await?)
    }
}
