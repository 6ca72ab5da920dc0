//! devlog's own diagnostics
//!
//! Internal events (subscriber failures, ignored overrides, demo progress) go
//! through `tracing`. This installs a stderr subscriber for them.

use std::io::IsTerminal;

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise `fallback`
pub fn diagnostics_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("devlog=info"))
}

/// Install the global diagnostics subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_diagnostics(fallback_filter: &str) -> Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true);

    tracing_subscriber::registry()
        .with(diagnostics_filter(fallback_filter))
        .with(stderr_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize diagnostics: {}", e))
}
