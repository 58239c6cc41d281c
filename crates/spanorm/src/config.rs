//! Facade configuration.

use serde::Deserialize;
use std::time::Duration;

/// Level at which statements are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    #[default]
    Debug,
    Trace,
}

#[cfg(feature = "tracing")]
impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Configuration for [`Db`](crate::Db).
///
/// Deserializable so applications can keep it next to their own settings:
///
/// ```toml
/// query_timeout_ms = 5000
/// log_level = "info"
/// max_sql_length = 120
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Per-operation timeout (statement, point read, scan or batch apply).
    /// `None` means no timeout (default).
    #[serde(rename = "query_timeout_ms", with = "millis")]
    pub query_timeout: Option<Duration>,
    /// Whether statements are logged before execution.
    pub log_statements: bool,
    /// Level of statement log events.
    pub log_level: LogLevel,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            log_statements: true,
            log_level: LogLevel::Debug,
            max_sql_length: Some(200),
        }
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-operation timeout.
    ///
    /// Operations exceeding this duration are dropped and return
    /// [`OrmError::Timeout`](crate::OrmError::Timeout).
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Override the statement log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Disable statement logging.
    pub fn disable_logging(mut self) -> Self {
        self.log_statements = false;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = DbConfig::new();
        assert_eq!(cfg.query_timeout, None);
        assert!(cfg.log_statements);
        assert_eq!(cfg.max_sql_length, Some(200));
    }

    #[test]
    fn loads_from_toml() {
        let cfg: DbConfig = toml::from_str(
            r#"
            query_timeout_ms = 1500
            log_level = "info"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.query_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert!(cfg.log_statements);
    }

    #[test]
    fn builder_methods() {
        let cfg = DbConfig::new()
            .with_query_timeout(Duration::from_secs(2))
            .disable_logging()
            .no_truncate();
        assert_eq!(cfg.query_timeout, Some(Duration::from_secs(2)));
        assert!(!cfg.log_statements);
        assert_eq!(cfg.max_sql_length, None);
    }
}
