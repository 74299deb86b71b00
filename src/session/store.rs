//! Session persistence with atomic per-pair transitions.
//!
//! The auto-close-on-reopen and duration logic only holds if transitions
//! for one (document, viewer) pair apply in arrival order. The store owns
//! that guarantee: the in-memory implementation serializes through the
//! open-session index's entry lock, a database implementation would use a
//! conditional update. Distinct pairs never contend.

use super::model::{AccessSession, ViewerIdentity};
use super::SessionError;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Index key for the at-most-one open session per pair invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub document_id: String,
    pub viewer: ViewerIdentity,
}

impl PairKey {
    pub fn new(document_id: impl Into<String>, viewer: ViewerIdentity) -> Self {
        Self {
            document_id: document_id.into(),
            viewer,
        }
    }
}

/// Result of an `open` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOutcome {
    /// The newly opened session.
    pub session_id: Uuid,
    /// Session that was defensively closed because its `closed` signal
    /// never arrived before this reopen.
    pub auto_closed: Option<Uuid>,
}

/// Record store with find-open-and-close-then-create semantics.
pub trait SessionStore: Send + Sync {
    /// Atomically: close any open session for `session`'s pair using the
    /// new session's start as the end time, then insert `session` as the
    /// pair's open session.
    fn open(&self, session: AccessSession) -> OpenOutcome;

    /// Atomically close the pair's open session at `at`.
    fn close(
        &self,
        document_id: &str,
        viewer: &ViewerIdentity,
        at: DateTime<Utc>,
        client_reported_secs: Option<u64>,
    ) -> Result<AccessSession, SessionError>;

    fn get(&self, id: Uuid) -> Option<AccessSession>;

    /// Snapshot of all records, open and closed, for reporting.
    fn sessions(&self) -> Vec<AccessSession>;
}

/// Concurrent in-memory session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    /// (document, viewer) -> currently open session id.
    open_index: DashMap<PairKey, Uuid>,
    records: DashMap<Uuid, AccessSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn open(&self, session: AccessSession) -> OpenOutcome {
        let key = PairKey::new(session.document_id.clone(), session.viewer.clone());
        let new_id = session.id;
        let new_start = session.started_at;

        // The entry lock serializes every transition for this pair.
        match self.open_index.entry(key) {
            Entry::Occupied(mut occupied) => {
                let prior_id = *occupied.get();
                if let Some(mut prior) = self.records.get_mut(&prior_id) {
                    prior.close(new_start, None);
                }
                self.records.insert(new_id, session);
                occupied.insert(new_id);
                OpenOutcome {
                    session_id: new_id,
                    auto_closed: Some(prior_id),
                }
            }
            Entry::Vacant(vacant) => {
                self.records.insert(new_id, session);
                vacant.insert(new_id);
                OpenOutcome {
                    session_id: new_id,
                    auto_closed: None,
                }
            }
        }
    }

    fn close(
        &self,
        document_id: &str,
        viewer: &ViewerIdentity,
        at: DateTime<Utc>,
        client_reported_secs: Option<u64>,
    ) -> Result<AccessSession, SessionError> {
        let key = PairKey::new(document_id, viewer.clone());
        match self.open_index.entry(key) {
            Entry::Occupied(occupied) => {
                let id = *occupied.get();
                let mut record = match self.records.get_mut(&id) {
                    Some(record) => record,
                    None => {
                        // Index points at a vanished record; drop the stale
                        // entry and report as no-open.
                        occupied.remove();
                        return Err(SessionError::NoOpenSession {
                            document_id: document_id.to_string(),
                            viewer: viewer.to_string(),
                        });
                    }
                };

                if at < record.started_at {
                    // A close that predates the open session belongs to an
                    // earlier, already-ended interval: stale delivery.
                    return Err(SessionError::DuplicateSignal {
                        document_id: document_id.to_string(),
                        viewer: viewer.to_string(),
                    });
                }

                record.close(at, client_reported_secs);
                let closed = record.clone();
                drop(record);
                occupied.remove();
                Ok(closed)
            }
            Entry::Vacant(_) => Err(SessionError::NoOpenSession {
                document_id: document_id.to_string(),
                viewer: viewer.to_string(),
            }),
        }
    }

    fn get(&self, id: Uuid) -> Option<AccessSession> {
        self.records.get(&id).map(|record| record.clone())
    }

    fn sessions(&self) -> Vec<AccessSession> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
