//! Logging bootstrap.
//!
//! Installs a global `tracing` subscriber filtered by `RUST_LOG`. Routing
//! decisions and endpoint selections are logged at `debug`, so
//! `RUST_LOG=rwsplit_core=debug,rwsplit_service=debug` traces every call.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

/// Builds the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    match format {
        LogFormat::Plain => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}")),
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}")),
    }
}
