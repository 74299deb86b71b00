// Vaultmark — protected document delivery library

pub mod clock;
pub mod config;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod watermark;

pub use error::DeliveryError;
pub use pipeline::{AccessGate, DeliveredDocument, DeliveryPipeline, DocumentMeta, ViewRequest};
