//! Diagnostic tracing for the cycle loop.
//!
//! Reads filters from `RUST_LOG` and writes to stderr so that stdout stays
//! reserved for command output (script state and cycle reports as JSON).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` when set, otherwise `default_filter`.
///
/// # Example
/// ```bash
/// RUST_LOG=callcycle=debug cargo run -- cycle
/// ```
pub fn init(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
