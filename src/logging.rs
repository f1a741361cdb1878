use std::env;
use std::io;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when no environment variable sets one.
pub const DEFAULT_LEVEL: &str = "warn";

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive (e.g., "debug", "cbake=trace")
    pub level: String,
    /// Whether stderr output uses colors
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            ansi: true,
        }
    }
}

impl LogConfig {
    /// `CBAKE_LOG`, then `RUST_LOG`, then [`DEFAULT_LEVEL`]
    pub fn from_env() -> Self {
        let level = env::var("CBAKE_LOG")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LEVEL.to_string());
        let ansi = env::var_os("NO_COLOR").is_none();
        Self { level, ansi }
    }

    /// `--verbose` forces debug output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self
    }
}

/// Install the global subscriber writing to stderr
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_new(&config.level).or_else(|_| EnvFilter::try_new(DEFAULT_LEVEL))?;

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        let config = LogConfig::default().with_verbose(true);
        assert_eq!(config.level, "debug");
        let config = LogConfig::default().with_verbose(false);
        assert_eq!(config.level, DEFAULT_LEVEL);
    }
}
