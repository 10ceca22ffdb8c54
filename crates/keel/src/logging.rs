//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

use keel_core::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// `--verbose` forces `debug`; otherwise `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig, verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::new(filter_directive(
        config,
        verbose,
        std::env::var("RUST_LOG").ok(),
    ));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.with_target(false).try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialise tracing: {e}"))
}

fn filter_directive(config: &LoggingConfig, verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    rust_log
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| config.level.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::config::LogLevel;

    fn config(level: LogLevel) -> LoggingConfig {
        LoggingConfig {
            level,
            format: LogFormat::Pretty,
        }
    }

    #[test]
    fn test_configured_level() {
        assert_eq!(filter_directive(&config(LogLevel::Warn), false, None), "warn");
    }

    #[test]
    fn test_rust_log_overrides_level() {
        assert_eq!(
            filter_directive(&config(LogLevel::Warn), false, Some("keel=trace".into())),
            "keel=trace"
        );
        assert_eq!(
            filter_directive(&config(LogLevel::Error), false, Some(" ".into())),
            "error"
        );
    }

    #[test]
    fn test_verbose_forces_debug() {
        assert_eq!(
            filter_directive(&config(LogLevel::Error), true, Some("warn".into())),
            "debug"
        );
    }
}
