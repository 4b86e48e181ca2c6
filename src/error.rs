use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The driver {0} is not implemented yet")]
    UnsupportedDriver(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Document store error: {0}")]
    DocumentStore(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl AppError {
    /// Stable machine-readable code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::UnsupportedDriver(_) => "UNSUPPORTED_DRIVER",
            AppError::Connection(_) => "CONNECTION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::DocumentStore(_) => "DOCUMENT_STORE_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<mysql_async::Error> for AppError {
    fn from(err: mysql_async::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for AppError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        AppError::Cache(err.to_string())
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DocumentStore(err.to_string())
    }
}

/// Startup step whose failure is fatal to the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    ResolveDriver,
    MySqlOpen,
    MySqlWrap,
    PostgresOpen,
    PostgresWrap,
    SqliteOpen,
    CachePool,
}

impl StartupStep {
    /// Numeric diagnostic code, `None` for configuration errors
    pub fn code(&self) -> Option<u16> {
        match self {
            StartupStep::ResolveDriver => None,
            StartupStep::MySqlOpen => Some(151),
            StartupStep::MySqlWrap => Some(152),
            StartupStep::PostgresOpen => Some(153),
            StartupStep::PostgresWrap => Some(154),
            StartupStep::SqliteOpen => Some(155),
            StartupStep::CachePool => Some(161),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StartupStep::ResolveDriver => "resolve relational driver",
            StartupStep::MySqlOpen => "open mysql connection",
            StartupStep::MySqlWrap => "wrap mysql connection",
            StartupStep::PostgresOpen => "open postgres connection",
            StartupStep::PostgresWrap => "wrap postgres connection",
            StartupStep::SqliteOpen => "open sqlite database",
            StartupStep::CachePool => "build cache pool",
        }
    }
}

impl fmt::Display for StartupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{} (panic code: {})", self.as_str(), code),
            None => f.write_str(self.as_str()),
        }
    }
}

/// Failure of a mandatory backend; handed to the fatal hook
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct StartupFailure {
    pub step: StartupStep,
    #[source]
    pub source: AppError,
}

impl StartupFailure {
    pub fn new(step: StartupStep, source: AppError) -> Self {
        Self { step, source }
    }
}
