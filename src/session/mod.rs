//! Access session tracking: who viewed which document, when, for how long.
//!
//! Driven by best-effort `opened`/`closed` client signals that may arrive
//! late, duplicated, out of order, or never. The state machine per
//! (document, viewer) pair is `NoSession -> Open -> Closed`, with a
//! defensive auto-close when an `opened` lands on an already-open pair.

pub mod geo;
pub mod model;
pub mod report;
pub mod signal;
pub mod store;
pub mod tracker;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A `closed` signal arrived with nothing to close — duplicate or
    /// out-of-order delivery. Reported and discarded, never fatal.
    #[error("no open session for document '{document_id}' and viewer '{viewer}'")]
    NoOpenSession { document_id: String, viewer: String },

    /// A `closed` signal predating the currently open session: a stale
    /// re-delivery for an interval that already ended.
    #[error("stale or duplicate close signal for document '{document_id}' and viewer '{viewer}'")]
    DuplicateSignal { document_id: String, viewer: String },
}

pub use geo::{GeoLocation, GeoResolver, NoLookupGeoResolver, StaticGeoResolver};
pub use model::{AccessSession, SessionState, ViewerIdentity};
pub use report::{SessionFilter, ViewReport};
pub use signal::{SignalKind, ViewSignal};
pub use store::{MemorySessionStore, OpenOutcome, PairKey, SessionStore};
pub use tracker::AccessTracker;
