use crate::error::{DebuggerError, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `log_level`. Output goes to stderr because stdout carries
/// the adapter protocol.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| DebuggerError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| DebuggerError::Logging(e.to_string()))
}
