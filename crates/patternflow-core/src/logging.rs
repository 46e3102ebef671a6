//! Logging configuration and setup.

use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level ("trace", "debug", "info", "warn", "error")
    pub level: String,
    /// Emit logs to stderr
    pub console_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
        }
    }
}

impl LogConfig {
    /// Parse the configured level, defaulting to INFO if invalid
    pub fn parse_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// Initialize the logging system.
///
/// `RUST_LOG` takes precedence over the configured level. Safe to call
/// more than once; later calls are ignored (relevant under `cargo test`).
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    let console_layer = if config.console_output {
        Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(false),
        )
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let config = LogConfig {
            level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(config.parse_level(), tracing::Level::DEBUG);

        let bad = LogConfig {
            level: "noisy".to_string(),
            ..Default::default()
        };
        assert_eq!(bad.parse_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LogConfig::default();
        init(&config);
        init(&config); // must not panic
    }
}
