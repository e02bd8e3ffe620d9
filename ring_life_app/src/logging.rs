// logging.rs - Console logging through tracing-subscriber
//
// Filtered by RUST_LOG (defaults to info). Per-generation timings are at debug.

use crate::error::CliError;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}
