// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines for interactive use.
    #[default]
    Text,
    /// JSON lines for log aggregation systems.
    Json,
}

/// Initialize the tracing subscriber for structured logging.
///
/// Filtering comes from `RUST_LOG` when set, defaulting to `info`.
/// Initializing twice returns an error from the underlying registry; call
/// once at startup.
pub fn init_subscriber(format: LogFormat) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init()?;
        }
    }
    Ok(())
}
