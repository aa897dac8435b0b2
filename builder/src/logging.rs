//! Diagnostic tracing for the builder.
//!
//! Tracing is for debugging a run and goes to stderr. The validation report
//! and lint warnings are product output and are printed regardless of
//! `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=builder=debug builder check tasks
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
