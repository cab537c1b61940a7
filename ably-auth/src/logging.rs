// Logging setup and secret redaction
// The engine logs through `tracing`; applications decide whether and how to
// install a subscriber.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Honour `RUST_LOG` when it is set
    pub use_env_filter: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            use_env_filter: true,
        }
    }
}

impl LogConfig {
    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }

    /// Directive string handed to the subscriber's filter
    pub fn filter_directive(&self) -> String {
        format!("ably_auth={}", self.level.as_str())
    }
}

#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn use_env_filter(mut self, enabled: bool) -> Self {
        self.config.use_env_filter = enabled;
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Install a global `tracing` subscriber.
///
/// Returns false if a subscriber was already installed.
pub fn init_logging(config: LogConfig) -> bool {
    let filter = if config.use_env_filter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()))
    } else {
        EnvFilter::new(config.filter_directive())
    };

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    };

    if installed {
        info!("Logging initialized with level: {:?}", config.level);
    }
    installed
}

/// Hide a secret, keeping a short prefix so log lines stay correlatable
pub fn redact_secret(value: &str) -> String {
    if value.chars().count() <= 8 {
        return "[REDACTED]".to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{}…[REDACTED]", prefix)
}

/// Redact the secret half of an API key, keeping the key name
pub fn redact_key(key: &str) -> String {
    match key.split_once(':') {
        Some((name, _)) => format!("{}:[REDACTED]", name),
        None => "[REDACTED]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_key_keeps_name() {
        assert_eq!(redact_key("app.key:secret"), "app.key:[REDACTED]");
        assert_eq!(redact_key("garbage"), "[REDACTED]");
    }

    #[test]
    fn test_redact_secret() {
        assert_eq!(redact_secret("short"), "[REDACTED]");
        assert_eq!(redact_secret("xVLyHw.token-body"), "xVLy…[REDACTED]");
    }

    #[test]
    fn test_builder_and_directive() {
        let config = LogConfig::builder()
            .level(LogLevel::Debug)
            .format(LogFormat::Text)
            .use_env_filter(false)
            .build();
        assert_eq!(config.filter_directive(), "ably_auth=debug");
        assert_eq!(config.format, LogFormat::Text);
    }
}
