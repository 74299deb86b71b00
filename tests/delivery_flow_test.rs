//! End-to-end tests for the delivery pipeline over its public API.

mod common;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use rstest::rstest;
use std::sync::Arc;
use vaultmark::clock::{Clock, ManualClock};
use vaultmark::integrity::{self, IntegrityError};
use vaultmark::pipeline::{AccessGate, DeliveryPipeline, DocumentMeta, ViewRequest};
use vaultmark::session::{
    AccessTracker, MemorySessionStore, NoLookupGeoResolver, SessionFilter, SessionState,
    SignalKind, ViewSignal, ViewerIdentity,
};
use vaultmark::store::{DerivativeStore, KeyLayout, MemoryObjectStore, StorageError, UrlSigner};
use vaultmark::watermark::StampStyle;
use vaultmark::DeliveryError;

struct AllowAll;

#[async_trait]
impl AccessGate for AllowAll {
    async fn can_access(&self, _viewer: &ViewerIdentity, _document_id: &str) -> bool {
        true
    }
}

/// Gate that only lets tenant members through, keyed on user ids.
struct MemberGate {
    members: Vec<String>,
}

#[async_trait]
impl AccessGate for MemberGate {
    async fn can_access(&self, viewer: &ViewerIdentity, _document_id: &str) -> bool {
        match viewer {
            ViewerIdentity::User(id) => self.members.contains(id),
            ViewerIdentity::Visitor(_) => false,
        }
    }
}

fn build_pipeline(gate: Arc<dyn AccessGate>, clock: &ManualClock) -> DeliveryPipeline {
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let store = Arc::new(DerivativeStore::new(
        Arc::new(MemoryObjectStore::new()),
        UrlSigner::new(
            b"integration-test-secret".to_vec(),
            "https://docs.example.com",
            clock.clone(),
        ),
        KeyLayout::default(),
        clock.clone(),
        300,
    ));
    let tracker = Arc::new(AccessTracker::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(NoLookupGeoResolver),
    ));
    DeliveryPipeline::new(
        gate,
        store,
        tracker,
        clock,
        "{{viewer}} {{date}}",
        StampStyle::default(),
    )
}

fn meta(id: &str) -> DocumentMeta {
    DocumentMeta {
        id: id.to_string(),
        name: format!("{}.pdf", id),
        mime_type: "application/pdf".to_string(),
        size: 0,
        tenant_id: "tenant-1".to_string(),
    }
}

fn view(id: &str, viewer: ViewerIdentity) -> ViewRequest {
    ViewRequest {
        document: meta(id),
        viewer,
        user_agent: "integration-agent".to_string(),
        remote_addr: None,
    }
}

fn alice() -> ViewerIdentity {
    ViewerIdentity::User("alice".to_string())
}

#[tokio::test]
async fn delivered_derivative_preserves_page_count_and_redeems() {
    let clock = ManualClock::at_epoch();
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    // Keep a handle on the store so the issued URL can be redeemed, the way
    // a retrieval endpoint would.
    let store = Arc::new(DerivativeStore::new(
        Arc::new(MemoryObjectStore::new()),
        UrlSigner::new(
            b"integration-test-secret".to_vec(),
            "https://docs.example.com",
            shared_clock.clone(),
        ),
        KeyLayout::default(),
        shared_clock.clone(),
        300,
    ));
    let tracker = Arc::new(AccessTracker::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(NoLookupGeoResolver),
    ));
    let pipeline = DeliveryPipeline::new(
        Arc::new(AllowAll),
        store.clone(),
        tracker,
        shared_clock,
        "{{viewer}} {{date}}",
        StampStyle::default(),
    );

    let original = common::sample_pdf(3, 612.0, 792.0);
    pipeline
        .upload(&meta("doc-1"), Bytes::from(original))
        .await
        .unwrap();

    let delivered = pipeline.deliver(view("doc-1", alice())).await.unwrap();
    assert_eq!(delivered.mime_type, "application/pdf");

    // The signed URL round-trips through the store within its TTL and the
    // derivative is still a 3-page document that passes the sanity gate.
    let stamped = store.redeem(&delivered.url).await.unwrap();
    assert_eq!(common::page_count(&stamped), 3);
    assert!(integrity::validate(&stamped).is_ok());
    assert_eq!(stamped.len() as u64, delivered.size);
}

#[tokio::test]
async fn signed_url_expires_after_ttl() {
    let clock = ManualClock::at_epoch();
    let objects = Arc::new(MemoryObjectStore::new());
    let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
    let store = Arc::new(DerivativeStore::new(
        objects,
        UrlSigner::new(
            b"integration-test-secret".to_vec(),
            "https://docs.example.com",
            shared_clock.clone(),
        ),
        KeyLayout::default(),
        shared_clock.clone(),
        300,
    ));
    let tracker = Arc::new(AccessTracker::new(
        Arc::new(MemorySessionStore::new()),
        Arc::new(NoLookupGeoResolver),
    ));
    let pipeline = DeliveryPipeline::new(
        Arc::new(AllowAll),
        store.clone(),
        tracker,
        shared_clock,
        "{{viewer}}",
        StampStyle::default(),
    );

    pipeline
        .upload(&meta("doc-1"), Bytes::from(common::sample_pdf(1, 612.0, 792.0)))
        .await
        .unwrap();
    let delivered = pipeline.deliver(view("doc-1", alice())).await.unwrap();

    clock.advance(Duration::seconds(300));
    assert!(store.redeem(&delivered.url).await.is_ok());

    clock.advance(Duration::seconds(1));
    assert_eq!(
        store.redeem(&delivered.url).await.unwrap_err(),
        StorageError::UrlExpired
    );
}

#[tokio::test]
async fn authorization_is_enforced_per_viewer() {
    let clock = ManualClock::at_epoch();
    let gate = MemberGate {
        members: vec!["alice".to_string()],
    };
    let pipeline = build_pipeline(Arc::new(gate), &clock);
    pipeline
        .upload(&meta("doc-1"), Bytes::from(common::sample_pdf(1, 612.0, 792.0)))
        .await
        .unwrap();

    assert!(pipeline.deliver(view("doc-1", alice())).await.is_ok());

    let err = pipeline
        .deliver(view("doc-1", ViewerIdentity::User("eve".to_string())))
        .await
        .unwrap_err();
    assert_eq!(err, DeliveryError::Unauthorized);

    let err = pipeline
        .deliver(view("doc-1", ViewerIdentity::Visitor("tok".to_string())))
        .await
        .unwrap_err();
    assert_eq!(err, DeliveryError::Unauthorized);
}

#[tokio::test]
async fn view_session_lifecycle_via_wire_signals() {
    let clock = ManualClock::at_epoch();
    let pipeline = build_pipeline(Arc::new(AllowAll), &clock);

    let opened = ViewSignal {
        event: SignalKind::Opened,
        document_id: "doc-1".to_string(),
        viewer_token: Some("visitor-tok".to_string()),
        timestamp_millis: 0,
        user_agent: "integration-agent".to_string(),
        duration_seconds: None,
    };
    pipeline.ingest_signal(&opened, None, None);

    let closed = ViewSignal {
        event: SignalKind::Closed,
        timestamp_millis: 30_000,
        duration_seconds: Some(30),
        ..opened.clone()
    };
    pipeline.ingest_signal(&closed, None, None);

    let sessions = pipeline.tracker().sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].state(), SessionState::Closed);
    assert_eq!(sessions[0].duration_secs, Some(30));

    let report = pipeline.tracker().report(&SessionFilter::default());
    assert_eq!(report.total_views, 1);
    assert_eq!(report.anonymous_viewers, 1);
    assert_eq!(report.authenticated_viewers, 0);
    assert_eq!(report.max_duration_secs, Some(30));
}

#[tokio::test]
async fn missed_close_is_absorbed_by_reopen() {
    let clock = ManualClock::at_epoch();
    let pipeline = build_pipeline(Arc::new(AllowAll), &clock);
    pipeline
        .upload(&meta("doc-1"), Bytes::from(common::sample_pdf(1, 612.0, 792.0)))
        .await
        .unwrap();

    // First view at t=0; the close signal never arrives.
    pipeline.deliver(view("doc-1", alice())).await.unwrap();

    // Second view at t=120 auto-closes the first.
    clock.advance(Duration::seconds(120));
    pipeline.deliver(view("doc-1", alice())).await.unwrap();

    let sessions = pipeline.tracker().sessions();
    assert_eq!(sessions.len(), 2);
    let closed: Vec<_> = sessions
        .iter()
        .filter(|s| s.state() == SessionState::Closed)
        .collect();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].duration_secs, Some(120));
}

#[rstest]
#[case::truncated(b"%PDF-1.7".to_vec(), IntegrityError::TooSmall { len: 8 })]
#[case::wrong_magic({
    let mut bytes = b"GIF89a...".to_vec();
    bytes.extend_from_slice(&vec![b'x'; 200]);
    bytes.extend_from_slice(b"%%EOF\n");
    bytes
}, IntegrityError::MalformedHeader)]
#[case::no_trailer({
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.extend_from_slice(&vec![b'x'; 200]);
    bytes
}, IntegrityError::MalformedTrailer)]
fn integrity_gate_rejections(#[case] bytes: Vec<u8>, #[case] expected: IntegrityError) {
    assert_eq!(integrity::validate(&bytes), Err(expected));
}

#[test]
fn integrity_gate_accepts_real_output() {
    assert!(integrity::validate(&common::sample_pdf(1, 612.0, 792.0)).is_ok());
}
