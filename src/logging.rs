//! Logging setup for the command-line binary.
//!
//! Filtering follows `RUST_LOG` and defaults to `info`, e.g.
//! `RUST_LOG=r2pd=debug` for verbose cache and locator output.

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
