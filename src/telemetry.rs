//! Logging setup for the node binary.
//!
//! Human-readable `tracing-subscriber` output to stdout. `RUST_LOG` takes
//! precedence over the configured level.

use tracing_subscriber::EnvFilter;

/// Build the log filter: `RUST_LOG` if set, otherwise `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber. Call once, before any events are emitted.
pub fn init(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .init();
}
