use std::io;

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Log output goes to stderr.
///
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init(verbose: u8) -> anyhow::Result<()> {
    let default_directive = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;
    Ok(())
}
