//! Time-boxed, capability-bearing retrieval URLs.
//!
//! A signed URL embeds the object key, an absolute expiry, and an
//! HMAC-SHA256 tag over both. Anyone holding the URL can redeem it until
//! expiry with no further authentication; derivatives carry a
//! viewer-identifying stamp, so TTLs are kept to minutes.

use super::StorageError;
use crate::clock::Clock;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Path segment separating the base URL from the signed key.
const RETRIEVAL_PATH: &str = "/d/";

/// Issues and verifies signed retrieval URLs against an injected clock.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    base_url: String,
    clock: Arc<dyn Clock>,
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>, base_url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            secret: secret.into(),
            base_url,
            clock,
        }
    }

    /// Issue a URL for `key` valid for `ttl_seconds` from now.
    pub fn issue(&self, key: &str, ttl_seconds: u64) -> String {
        let expires = self.clock.now().timestamp() + ttl_seconds as i64;
        let tag = self.sign(key, expires);
        format!(
            "{}{}{}?expires={}&sig={}",
            self.base_url,
            RETRIEVAL_PATH,
            urlencoding::encode(key),
            expires,
            tag,
        )
    }

    /// Verify a URL and return the object key it grants access to.
    ///
    /// Rejects with `UrlInvalid` on any structural or signature mismatch
    /// and `UrlExpired` once the embedded expiry has passed. Expiry is
    /// checked after the signature so a forged expiry cannot probe the
    /// clock.
    pub fn verify(&self, url: &str) -> Result<String, StorageError> {
        let rest = url
            .strip_prefix(&self.base_url)
            .and_then(|r| r.strip_prefix(RETRIEVAL_PATH))
            .ok_or(StorageError::UrlInvalid)?;

        let (encoded_key, query) = rest.split_once('?').ok_or(StorageError::UrlInvalid)?;
        let key = urlencoding::decode(encoded_key)
            .map_err(|_| StorageError::UrlInvalid)?
            .into_owned();

        let mut expires: Option<i64> = None;
        let mut sig: Option<&str> = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", value)) => {
                    expires = Some(value.parse().map_err(|_| StorageError::UrlInvalid)?)
                }
                Some(("sig", value)) => sig = Some(value),
                _ => return Err(StorageError::UrlInvalid),
            }
        }
        let expires = expires.ok_or(StorageError::UrlInvalid)?;
        let sig = sig.ok_or(StorageError::UrlInvalid)?;

        let tag = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| StorageError::UrlInvalid)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any size");
        mac.update(Self::message(&key, expires).as_bytes());
        mac.verify_slice(&tag).map_err(|_| StorageError::UrlInvalid)?;

        if self.clock.now().timestamp() > expires {
            return Err(StorageError::UrlExpired);
        }

        Ok(key)
    }

    fn sign(&self, key: &str, expires: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any size");
        mac.update(Self::message(key, expires).as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn message(key: &str, expires: i64) -> String {
        format!("{}\n{}", key, expires)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    fn signer(clock: &ManualClock) -> UrlSigner {
        UrlSigner::new(
            b"test-secret".to_vec(),
            "https://docs.example.com",
            Arc::new(clock.clone()),
        )
    }

    #[test]
    fn test_issue_then_verify_round_trips_key() {
        let clock = ManualClock::at_epoch();
        let signer = signer(&clock);

        let url = signer.issue("derivatives/doc-1/u-alice/0-ab.pdf", 300);
        let key = signer.verify(&url).unwrap();
        assert_eq!(key, "derivatives/doc-1/u-alice/0-ab.pdf");
    }

    #[test]
    fn test_url_valid_at_exact_expiry_rejected_after() {
        let clock = ManualClock::at_epoch();
        let signer = signer(&clock);
        let url = signer.issue("k", 300);

        // Still valid at t=300
        clock.advance(Duration::seconds(300));
        assert!(signer.verify(&url).is_ok());

        // Rejected at t=301
        clock.advance(Duration::seconds(1));
        assert_eq!(signer.verify(&url).unwrap_err(), StorageError::UrlExpired);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let clock = ManualClock::at_epoch();
        let signer = signer(&clock);
        let url = signer.issue("k", 300);

        let mut tampered = url.clone();
        let flipped = if tampered.ends_with('A') { 'B' } else { 'A' };
        tampered.pop();
        tampered.push(flipped);
        assert_eq!(
            signer.verify(&tampered).unwrap_err(),
            StorageError::UrlInvalid
        );
    }

    #[test]
    fn test_tampered_expiry_rejected_as_invalid_not_expired() {
        let clock = ManualClock::at_epoch();
        let signer = signer(&clock);
        let url = signer.issue("k", 300);

        // Stretch the expiry without re-signing
        let stretched = url.replace("expires=300", "expires=999999");
        assert_eq!(
            signer.verify(&stretched).unwrap_err(),
            StorageError::UrlInvalid
        );
    }

    #[test]
    fn test_key_swap_rejected() {
        let clock = ManualClock::at_epoch();
        let signer = signer(&clock);
        let url = signer.issue("derivatives/doc-1/u-alice/x.pdf", 300);

        let swapped = url.replace("u-alice", "u-mallory");
        assert_eq!(
            signer.verify(&swapped).unwrap_err(),
            StorageError::UrlInvalid
        );
    }

    #[test]
    fn test_foreign_url_rejected() {
        let clock = ManualClock::at_epoch();
        let signer = signer(&clock);
        assert_eq!(
            signer.verify("https://other.example.com/d/k?expires=1&sig=x"),
            Err(StorageError::UrlInvalid)
        );
        assert_eq!(signer.verify("garbage"), Err(StorageError::UrlInvalid));
    }

    #[test]
    fn test_keys_with_slashes_survive_encoding() {
        let clock = ManualClock::at_epoch();
        let signer = signer(&clock);
        let key = "derivatives/doc 1/v-tok/5-xy.pdf";
        let url = signer.issue(key, 60);
        assert_eq!(signer.verify(&url).unwrap(), key);
    }
}
