//! Derivative store: originals, generated derivatives, and their URLs.
//!
//! Composes the object store, key layout, and URL signer behind the
//! operations the pipeline needs. Construction is explicit — the store
//! client is injected, never an ambient singleton.

use super::keys::KeyLayout;
use super::object_store::{ObjectStore, StorageError};
use super::signed_url::UrlSigner;
use crate::clock::Clock;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

pub struct DerivativeStore {
    objects: Arc<dyn ObjectStore>,
    signer: UrlSigner,
    keys: KeyLayout,
    clock: Arc<dyn Clock>,
    url_ttl_seconds: u64,
}

impl DerivativeStore {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        signer: UrlSigner,
        keys: KeyLayout,
        clock: Arc<dyn Clock>,
        url_ttl_seconds: u64,
    ) -> Self {
        Self {
            objects,
            signer,
            keys,
            clock,
            url_ttl_seconds,
        }
    }

    pub fn url_ttl_seconds(&self) -> u64 {
        self.url_ttl_seconds
    }

    /// Persist a document's immutable original.
    pub async fn store_original(&self, document_id: &str, bytes: Bytes) -> Result<String, StorageError> {
        let key = self.keys.original(document_id);
        self.objects.put(&key, bytes).await?;
        Ok(key)
    }

    pub async fn load_original(&self, document_id: &str) -> Result<Bytes, StorageError> {
        self.objects.get(&self.keys.original(document_id)).await
    }

    /// Persist a freshly generated derivative under a request-unique key.
    pub async fn store_derivative(
        &self,
        document_id: &str,
        viewer_slug: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        let key = self.keys.derivative(document_id, viewer_slug, self.clock.now());
        self.objects.put(&key, bytes).await?;
        debug!(key = %key, "derivative stored");
        Ok(key)
    }

    /// Issue a time-boxed retrieval URL for a stored object.
    pub fn issue_url(&self, key: &str) -> String {
        self.signer.issue(key, self.url_ttl_seconds)
    }

    /// Redeem a signed URL: verify signature and expiry, then fetch.
    pub async fn redeem(&self, url: &str) -> Result<Bytes, StorageError> {
        let key = self.signer.verify(url)?;
        self.objects.get(&key).await
    }

    /// Remove a document's original and every derivative generated from it.
    pub async fn remove_document(&self, document_id: &str) -> Result<u64, StorageError> {
        let derivatives = self
            .objects
            .delete_prefix(&self.keys.derivatives_of(document_id))
            .await?;
        let originals = self
            .objects
            .delete_prefix(&self.keys.original(document_id))
            .await?;
        debug!(document_id, derivatives, originals, "document removed");
        Ok(derivatives + originals)
    }
}
