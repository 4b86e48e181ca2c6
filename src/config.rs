use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub activate: ActivateConfig,
    pub rdbms: RelationalConfig,
    pub redis: CacheConfig,
    pub mongo: DocumentStoreConfig,
    pub logging: LoggingConfig,
}

/// Which backends the startup sequence brings up
#[derive(Debug, Clone, Deserialize)]
pub struct ActivateConfig {
    pub rdbms: bool,
    pub redis: bool,
    pub mongo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationalConfig {
    pub driver: String,
    pub user: String,
    pub pass: String,
    pub db_name: String,
    pub host: String,
    pub port: u16,
    pub sslmode: String,
    pub time_zone: String,
    pub max_idle_conns: u32,
    pub max_open_conns: u32,
    pub conn_max_lifetime_secs: u64,
    pub log_level: i64,
}

impl RelationalConfig {
    pub fn conn_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.conn_max_lifetime_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub pool_size: usize,
    /// Connection setup deadline in seconds
    pub conn_ttl: u64,
}

impl CacheConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn conn_ttl(&self) -> Duration {
        Duration::from_secs(self.conn_ttl)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentStoreConfig {
    pub uri: String,
    pub pool_size: u32,
    /// Connection setup deadline in seconds
    pub conn_ttl: u64,
}

impl DocumentStoreConfig {
    pub fn conn_ttl(&self) -> Duration {
        Duration::from_secs(self.conn_ttl)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

/// Environment variables and the config keys they override
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ACTIVATE_RDBMS", "activate.rdbms"),
    ("ACTIVATE_REDIS", "activate.redis"),
    ("ACTIVATE_MONGO", "activate.mongo"),
    ("DBDRIVER", "rdbms.driver"),
    ("DBUSER", "rdbms.user"),
    ("DBPASS", "rdbms.pass"),
    ("DBNAME", "rdbms.db_name"),
    ("DBHOST", "rdbms.host"),
    ("DBPORT", "rdbms.port"),
    ("DBSSLMODE", "rdbms.sslmode"),
    ("DBTIMEZONE", "rdbms.time_zone"),
    ("DBMAXIDLECONNS", "rdbms.max_idle_conns"),
    ("DBMAXOPENCONNS", "rdbms.max_open_conns"),
    ("DBCONNMAXLIFETIME", "rdbms.conn_max_lifetime_secs"),
    ("DBLOGLEVEL", "rdbms.log_level"),
    ("REDISHOST", "redis.host"),
    ("REDISPORT", "redis.port"),
    ("POOLSIZE", "redis.pool_size"),
    ("CONNTTL", "redis.conn_ttl"),
    ("MONGO_URI", "mongo.uri"),
    ("MONGO_POOLSIZE", "mongo.pool_size"),
    ("MONGO_CONNTTL", "mongo.conn_ttl"),
    ("RUST_LOG", "logging.level"),
    ("RUST_LOG_STYLE", "logging.style"),
];

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file before reading the environment
        let _ = dotenv::dotenv();

        let mut builder = Self::defaults()?;

        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = env::var(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("activate.rdbms", false)?
            .set_default("activate.redis", false)?
            .set_default("activate.mongo", false)?
            .set_default("rdbms.driver", "sqlite3")?
            .set_default("rdbms.user", "")?
            .set_default("rdbms.pass", "")?
            .set_default("rdbms.db_name", "database.db")?
            .set_default("rdbms.host", "localhost")?
            .set_default("rdbms.port", 5432)?
            .set_default("rdbms.sslmode", "disable")?
            .set_default("rdbms.time_zone", "UTC")?
            .set_default("rdbms.max_idle_conns", 10)?
            .set_default("rdbms.max_open_conns", 100)?
            .set_default("rdbms.conn_max_lifetime_secs", 3600)?
            .set_default("rdbms.log_level", 1)?
            .set_default("redis.host", "127.0.0.1")?
            .set_default("redis.port", 6379)?
            .set_default("redis.pool_size", 10)?
            .set_default("redis.conn_ttl", 5)?
            .set_default("mongo.uri", "mongodb://127.0.0.1:27017")?
            .set_default("mongo.pool_size", 10)?
            .set_default("mongo.conn_ttl", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")
    }
}
