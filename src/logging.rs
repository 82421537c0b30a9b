//! Process-wide `tracing` setup

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ClientError, Result};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG`, when set, takes precedence over `filter`.
pub fn init(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| ClientError::Configuration(format!("Invalid log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| ClientError::Configuration(format!("Logging already initialized: {e}")))
}
