// Relational store: driver selection, pooled connection and the ORM-style handle
pub mod logger;
pub mod mysql;
pub mod postgresql;
pub mod sqlite;

pub use logger::{LogLevel, StatementLogger};
pub use mysql::MySqlStore;
pub use postgresql::PostgresStore;
pub use sqlite::SqliteStore;

use std::time::Instant;

use crate::config::RelationalConfig;
use crate::error::{AppError, StartupFailure, StartupStep};
use crate::services::connection_pool::{mask_credentials, mask_dsn, PoolSettings};

/// Supported relational drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Postgres,
    MySql,
    Sqlite,
}

impl Driver {
    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Driver::Postgres),
            "mysql" => Ok(Driver::MySql),
            "sqlite3" | "sqlite" => Ok(Driver::Sqlite),
            _ => Err(AppError::UnsupportedDriver(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Postgres => "postgres",
            Driver::MySql => "mysql",
            Driver::Sqlite => "sqlite3",
        }
    }
}

/// Driver-specific pooled connection
pub enum RelationalPool {
    Postgres(PostgresStore),
    MySql(MySqlStore),
    Sqlite(SqliteStore),
}

impl RelationalPool {
    pub fn driver(&self) -> Driver {
        match self {
            RelationalPool::Postgres(_) => Driver::Postgres,
            RelationalPool::MySql(_) => Driver::MySql,
            RelationalPool::Sqlite(_) => Driver::Sqlite,
        }
    }

    pub fn settings(&self) -> PoolSettings {
        match self {
            RelationalPool::Postgres(store) => store.settings(),
            RelationalPool::MySql(store) => store.settings(),
            RelationalPool::Sqlite(store) => store.settings(),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        match self {
            RelationalPool::Postgres(store) => store.ping().await,
            RelationalPool::MySql(store) => store.ping().await,
            RelationalPool::Sqlite(store) => store.ping().await,
        }
    }
}

/// ORM-style relational handle: a pool plus its statement logger
pub struct Database {
    pool: RelationalPool,
    logger: StatementLogger,
}

impl Database {
    /// Open the configured relational store.
    ///
    /// Every error is tagged with the step that failed; callers treat
    /// these as fatal. The network drivers carry no explicit deadline.
    pub async fn open(config: &RelationalConfig) -> Result<Self, StartupFailure> {
        let driver = Driver::from_str(&config.driver)
            .map_err(|e| StartupFailure::new(StartupStep::ResolveDriver, e))?;
        let settings = PoolSettings::from_config(config);
        let log_level = LogLevel::from_level(config.log_level);

        let db = match driver {
            Driver::MySql => {
                let url = mysql::connection_url(config)
                    .map_err(|e| StartupFailure::new(StartupStep::MySqlOpen, e))?;
                tracing::info!("Connecting to mysql database: {}", mask_credentials(&url));
                let store = MySqlStore::open(&url, settings)
                    .map_err(|e| StartupFailure::new(StartupStep::MySqlOpen, e))?;
                Self::wrap(RelationalPool::MySql(store), log_level)
                    .await
                    .map_err(|e| StartupFailure::new(StartupStep::MySqlWrap, e))?
            }
            Driver::Postgres => {
                let dsn = postgresql::connection_string(config);
                tracing::info!("Connecting to postgres database: {}", mask_dsn(&dsn));
                let store = PostgresStore::open(&dsn, settings)
                    .map_err(|e| StartupFailure::new(StartupStep::PostgresOpen, e))?;
                Self::wrap(RelationalPool::Postgres(store), log_level)
                    .await
                    .map_err(|e| StartupFailure::new(StartupStep::PostgresWrap, e))?
            }
            Driver::Sqlite => {
                tracing::info!("Opening sqlite database: {}", config.db_name);
                let store = SqliteStore::open(&config.db_name, settings)
                    .await
                    .map_err(|e| StartupFailure::new(StartupStep::SqliteOpen, e))?;
                Self::wrap(RelationalPool::Sqlite(store), LogLevel::Silent)
                    .await
                    .map_err(|e| StartupFailure::new(StartupStep::SqliteOpen, e))?
            }
        };

        tracing::info!("Successfully connected to {} database", driver.as_str());
        Ok(db)
    }

    /// Wrap an opened pool and verify it answers
    pub async fn wrap(pool: RelationalPool, log_level: LogLevel) -> Result<Self, AppError> {
        let db = Self {
            logger: StatementLogger::new(log_level, pool.driver().as_str()),
            pool,
        };
        db.ping().await?;
        Ok(db)
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let start = Instant::now();
        let result = self.pool.ping().await;
        let error = result.as_ref().err().map(|e| e.to_string());
        self.logger.trace("SELECT 1", start.elapsed(), error.as_deref());
        result
    }

    pub fn driver(&self) -> Driver {
        self.pool.driver()
    }

    pub fn pool(&self) -> &RelationalPool {
        &self.pool
    }

    pub fn settings(&self) -> PoolSettings {
        self.pool.settings()
    }

    pub fn log_level(&self) -> LogLevel {
        self.logger.level()
    }
}
