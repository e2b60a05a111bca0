// linesift - util/logging.rs
//
// Structured logging with runtime-selectable diagnostics.
//
// Activation: environment variable RUST_LOG=debug (or trace).
// Output: stderr only. Stdout carries search results and must stay byte-exact,
// so nothing is ever logged there.

use tracing_subscriber::EnvFilter;

/// Initialise the logging subsystem.
///
/// Priority: RUST_LOG env var > default level ("off"). A search tool is
/// silent unless diagnostics are explicitly requested.
pub fn init() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(super::constants::DEFAULT_LOG_LEVEL)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();

    tracing::debug!(
        version = super::constants::APP_VERSION,
        "Logging initialised"
    );
}
