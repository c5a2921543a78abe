//! Diagnostic tracing for the engine.
//!
//! Reads `RUST_LOG` and defaults to `warn`. Output goes to stderr so the
//! reports printed on stdout stay machine readable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// ```bash
/// RUST_LOG=race_ledger=debug race-ledger race --count 100
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
