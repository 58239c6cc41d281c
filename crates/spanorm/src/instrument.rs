//! Statement logging and per-operation timeouts.

use crate::config::{DbConfig, LogLevel};
use crate::error::{OrmError, OrmResult};
use std::future::Future;
use std::time::Duration;

/// Execution settings carried by readers, read-writers, relations and
/// mutators. Derived from [`DbConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    pub query_timeout: Option<Duration>,
    pub log_statements: bool,
    pub log_level: LogLevel,
    pub max_sql_length: Option<usize>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        DbConfig::default().into()
    }
}

impl From<DbConfig> for ExecOptions {
    fn from(cfg: DbConfig) -> Self {
        Self {
            query_timeout: cfg.query_timeout,
            log_statements: cfg.log_statements,
            log_level: cfg.log_level,
            max_sql_length: cfg.max_sql_length,
        }
    }
}

/// What is about to run, for the log event.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpContext<'a> {
    pub op: &'static str,
    pub table: &'a str,
    pub sql: Option<&'a str>,
    pub params: usize,
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

impl ExecOptions {
    /// Emit the log event for `ctx`, then run `future` under the timeout.
    pub(crate) async fn run<T, F>(&self, ctx: OpContext<'_>, future: F) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>>,
    {
        self.log(&ctx);
        match self.query_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, future).await {
                Ok(result) => result,
                Err(_) => Err(OrmError::Timeout(timeout)),
            },
            None => future.await,
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    fn truncate_sql<'s>(&self, sql: &'s str) -> std::borrow::Cow<'s, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    #[cfg(feature = "tracing")]
    fn log(&self, ctx: &OpContext<'_>) {
        use tracing::Level;

        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        if !self.log_statements {
            return;
        }
        let level = Level::from(self.log_level);
        match ctx.sql {
            Some(sql) => emit_at_level!(
                level,
                target: "spanorm.sql",
                op = ctx.op,
                table = ctx.table,
                params = ctx.params,
                sql = %self.truncate_sql(sql),
            ),
            None => emit_at_level!(
                level,
                target: "spanorm.sql",
                op = ctx.op,
                table = ctx.table,
                params = ctx.params,
            ),
        }
    }

    #[cfg(not(feature = "tracing"))]
    fn log(&self, ctx: &OpContext<'_>) {
        let _ = ctx;
    }
}
