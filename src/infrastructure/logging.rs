//! Logging configuration
//!
//! Initializes tracing for the application.

use tracing_subscriber::{EnvFilter, fmt};

/// Builds the filter used by [`init_logging`]; `RUST_LOG` wins over `level`
#[must_use]
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging with the specified level
///
/// Logs go to stderr so step output on stdout stays clean. Calling this more
/// than once is harmless.
pub fn init_logging(level: &str) {
    let _ = fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init();
}
