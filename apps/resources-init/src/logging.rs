use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// Filter precedence: `RUST_LOG`, then the `-v` count, then `logging.level`.
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive(&config.level, verbose))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!(e))
}

fn directive(level: &str, verbose: u8) -> &str {
    match verbose {
        0 => level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
