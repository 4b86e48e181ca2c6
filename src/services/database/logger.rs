// Statement logging for the relational handle
//
// Verbosity follows the ORM convention: 1 silent, 2 error, 3 warn, 4 info.

use std::time::Duration;

/// Slow statements are reported at warn level
const SLOW_THRESHOLD: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Silent = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
}

impl LogLevel {
    /// Out-of-range levels clamp to the nearest end
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => LogLevel::Silent,
            2 => LogLevel::Error,
            3 => LogLevel::Warn,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Silent => "silent",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
        }
    }
}

/// Emits statement traces according to a [`LogLevel`]
#[derive(Debug, Clone, Copy)]
pub struct StatementLogger {
    level: LogLevel,
    driver: &'static str,
}

impl StatementLogger {
    pub fn new(level: LogLevel, driver: &'static str) -> Self {
        Self { level, driver }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn trace(&self, sql: &str, elapsed: Duration, error: Option<&str>) {
        match error {
            Some(err) if self.level >= LogLevel::Error => {
                tracing::error!(driver = self.driver, elapsed_ms = elapsed.as_millis() as u64, sql, "{}", err);
            }
            Some(_) => {}
            None if elapsed >= SLOW_THRESHOLD && self.level >= LogLevel::Warn => {
                tracing::warn!(driver = self.driver, elapsed_ms = elapsed.as_millis() as u64, sql, "slow statement");
            }
            None if self.level >= LogLevel::Info => {
                tracing::info!(driver = self.driver, elapsed_ms = elapsed.as_millis() as u64, sql, "statement");
            }
            None => {}
        }
    }
}
