//! Logging setup for the CLI binaries.
//!
//! Installs a global tracing subscriber writing to stderr so that stdout
//! stays reserved for the training report and the prediction payload.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV: &str = "RESRISK_LOG";

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize tracing. Subsequent calls are no-ops.
pub fn init() {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
