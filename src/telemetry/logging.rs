//! Logging configuration and initialization
//!
//! Structured logging with tracing: compact console output by default,
//! JSON on request, and an optional non-blocking log file.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "HWPLAY_LOG";

/// Environment variable selecting the output format (`json`)
pub const LOG_FORMAT_ENV: &str = "HWPLAY_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log file path; console only when unset
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs
    pub json_format: bool,
    /// Filter used when neither `HWPLAY_LOG` nor `RUST_LOG` is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Whether JSON output was requested here or through the environment
    pub fn wants_json(&self, env_format: Option<&str>) -> bool {
        self.json_format || env_format.is_some_and(|format| format.eq_ignore_ascii_case("json"))
    }
}

/// Initialize the logging system with the given configuration
///
/// The returned guard flushes the log file when dropped and must be held
/// for the life of the program.
///
/// # Environment Variables
///
/// - `HWPLAY_LOG`: log filter (e.g. "debug", "info,hwplay::video=trace")
/// - `HWPLAY_LOG_FORMAT`: set to "json" for JSON output
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .or_else(|_| EnvFilter::try_new(&config.default_level))?;

    let env_format = std::env::var(LOG_FORMAT_ENV).ok();
    let use_json = config.wants_json(env_format.as_deref());

    let console_layer = if use_json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .boxed()
    };

    let mut file_guard = None;
    let file_layer = match &config.file_path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            file_guard = Some(guard);
            Some(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        target: "hwplay",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        log_file = ?config.file_path,
        "Logging initialized"
    );

    Ok(file_guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.file_path.is_none());
        assert!(!config.json_format);
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn test_json_selection() {
        let config = LogConfig::default();
        assert!(!config.wants_json(None));
        assert!(config.wants_json(Some("JSON")));
        assert!(!config.wants_json(Some("pretty")));

        let config = LogConfig {
            json_format: true,
            ..LogConfig::default()
        };
        assert!(config.wants_json(None));
        assert!(config.wants_json(Some("compact")));
    }
}
