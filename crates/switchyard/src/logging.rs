//! Logging setup.
//!
//! Logs go to stderr so they never mix with command output. The filter is
//! read from `SWITCHYARD_LOG` (standard `EnvFilter` syntax) and falls back
//! to a level chosen by the `-v` count.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "SWITCHYARD_LOG";

/// Maps the `-v` count to a default log level.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber.
///
/// Only the first call installs anything; later calls are no-ops.
pub fn init(verbosity: u8) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
