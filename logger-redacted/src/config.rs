// Logger configuration
use serde::{Deserialize, Serialize};

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub redaction_enabled: bool,
    pub log_level: String,
    pub format: LogFormat,
    pub development: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            log_level: "info".to_string(),
            format: LogFormat::Json,
            development: false,
        }
    }
}

impl LoggerConfig {
    /// Read `RXOPS_ENV` and `RXOPS_LOG_FORMAT`; development mode switches to
    /// human-readable output unless a format is forced.
    pub fn from_env() -> Self {
        let development = std::env::var("RXOPS_ENV")
            .map(|env| env.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let format = match std::env::var("RXOPS_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ if development => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        Self {
            development,
            format,
            ..Self::default()
        }
    }

    pub fn with_log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_redaction(mut self, enabled: bool) -> Self {
        self.redaction_enabled = enabled;
        self
    }
}
