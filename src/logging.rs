//! `tracing-subscriber` setup for the command-line tool.
//!
//! The library only emits `tracing` events; installing a subscriber is up to the application.
//! `RUST_LOG`, when set, overrides the level chosen from the command line.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level for this crate's events.
    pub level: Level,
    /// Include the module path in each line.
    pub with_target: bool,
    /// Use ANSI colors.
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Level from `-v` / `-q` counts.
    ///
    /// - `-q`: warnings and errors only
    /// - none: info
    /// - `-v`: debug
    /// - `-vv`: trace
    #[must_use]
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        };
        Self {
            level,
            with_target: verbose > 1,
            ..Self::default()
        }
    }
}

/// Install the global subscriber, writing to stderr.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .without_time();

    tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(layer)
        .try_init()
}

/// `RUST_LOG` if set, else `warn` for dependencies and `level` for this crate.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("warn,qbase_loader={level}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(LogConfig::from_verbosity(0, false).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(1, false).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(3, false).level, Level::TRACE);
        assert_eq!(LogConfig::from_verbosity(2, true).level, Level::WARN);
    }
}
