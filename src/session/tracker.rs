//! Access session tracker.
//!
//! Applies `opened`/`closed` transitions to the session store, attaching
//! user-agent and best-effort geolocation on open. Tracking is telemetry:
//! its errors are reported to the caller for logging but must never block
//! or fail document viewing.

use super::geo::{GeoLocation, GeoResolver};
use super::model::{AccessSession, ViewerIdentity};
use super::report::{self, SessionFilter, ViewReport};
use super::signal::{SignalKind, ViewSignal};
use super::store::{OpenOutcome, SessionStore};
use super::SessionError;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AccessTracker {
    store: Arc<dyn SessionStore>,
    geo: Arc<dyn GeoResolver>,
}

impl AccessTracker {
    pub fn new(store: Arc<dyn SessionStore>, geo: Arc<dyn GeoResolver>) -> Self {
        Self { store, geo }
    }

    /// Apply an `opened` transition for the pair at `at`.
    ///
    /// When the pair already has an open session — a missed `closed` — it is
    /// defensively closed at `at` first, so its duration stops drifting.
    pub fn record_opened(
        &self,
        document_id: &str,
        viewer: ViewerIdentity,
        at: DateTime<Utc>,
        user_agent: &str,
        remote_addr: Option<IpAddr>,
    ) -> OpenOutcome {
        // Geo lookup is best-effort by construction: the resolver returns
        // Unknown rather than erroring, so it cannot block the transition.
        let location = remote_addr
            .map(|addr| self.geo.resolve(addr))
            .unwrap_or(GeoLocation::Unknown);

        let session = AccessSession::begin(document_id, viewer, at, user_agent, location);
        let outcome = self.store.open(session);

        if let Some(prior) = outcome.auto_closed {
            warn!(
                document_id,
                prior_session = %prior,
                "auto-closed a session left open by a missed close signal"
            );
        }
        debug!(document_id, session = %outcome.session_id, "session opened");
        outcome
    }

    /// Apply a `closed` transition for the pair at `at`.
    pub fn record_closed(
        &self,
        document_id: &str,
        viewer: &ViewerIdentity,
        at: DateTime<Utc>,
        client_reported_secs: Option<u64>,
    ) -> Result<AccessSession, SessionError> {
        let closed = self.store.close(document_id, viewer, at, client_reported_secs)?;
        debug!(
            document_id,
            session = %closed.id,
            duration_secs = closed.duration_secs,
            "session closed"
        );
        Ok(closed)
    }

    /// Apply a wire signal. The viewer must already be resolved — identity
    /// resolution (authenticated id vs. visitor token) is the caller's job
    /// because only it knows the authenticated context.
    pub fn apply_signal(
        &self,
        signal: &ViewSignal,
        viewer: ViewerIdentity,
        remote_addr: Option<IpAddr>,
    ) -> Result<Option<AccessSession>, SessionError> {
        let at = match signal.event_time() {
            Some(at) => at,
            None => {
                warn!(
                    document_id = %signal.document_id,
                    timestamp_millis = signal.timestamp_millis,
                    "discarding signal with unrepresentable timestamp"
                );
                return Ok(None);
            }
        };

        match signal.event {
            SignalKind::Opened => {
                self.record_opened(
                    &signal.document_id,
                    viewer,
                    at,
                    &signal.user_agent,
                    remote_addr,
                );
                Ok(None)
            }
            SignalKind::Closed => self
                .record_closed(&signal.document_id, &viewer, at, signal.duration_seconds)
                .map(Some),
        }
    }

    /// Read-only aggregation over the recorded sessions.
    pub fn report(&self, filter: &SessionFilter) -> ViewReport {
        report::summarize(&self.store.sessions(), filter)
    }

    pub fn sessions(&self) -> Vec<AccessSession> {
        self.store.sessions()
    }
}
