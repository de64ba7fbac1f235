use serde::{Deserialize, Serialize};

/// Observability configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Process-wide log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-request HTTP spans.
    #[serde(default)]
    pub request_logging: RequestLoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_line: bool,

    /// Include the span stack on each JSON line.
    #[serde(default = "default_true")]
    pub include_spans: bool,

    /// Extra filter directives, e.g. `"sqlx=warn,threadchat::services=debug"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            file_line: false,
            include_spans: true,
            filter: None,
        }
    }
}

/// Request span configuration for the HTTP trace layer.
///
/// Each request gets a span with its method and URI. The span and the
/// response line are emitted at `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestLoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_request_level")]
    pub level: LogLevel,
}

impl Default for RequestLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_request_level(),
        }
    }
}

fn default_request_level() -> LogLevel {
    LogLevel::Info
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Multi-line, for local development.
    Pretty,
    #[default]
    Compact,
    /// JSON lines, for log shippers.
    Json,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ObservabilityConfig = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.request_logging.enabled);
        assert_eq!(config.request_logging.level, LogLevel::Info);
    }

    #[test]
    fn test_request_logging_can_be_disabled() {
        let config: ObservabilityConfig = toml::from_str(
            r#"
            [logging]
            format = "json"
            filter = "sqlx=warn"

            [request_logging]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter.as_deref(), Some("sqlx=warn"));
        assert!(!config.request_logging.enabled);
    }
}
