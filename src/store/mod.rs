//! Derivative storage: object store, key layout, signed retrieval URLs.

pub mod derivative;
pub mod keys;
pub mod object_store;
pub mod signed_url;

pub use derivative::DerivativeStore;
pub use keys::KeyLayout;
pub use object_store::{MemoryObjectStore, ObjectStore, StorageError};
pub use signed_url::UrlSigner;
