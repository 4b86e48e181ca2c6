// PostgreSQL store backed by a deadpool connection pool
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;

use crate::config::RelationalConfig;
use crate::error::AppError;
use crate::services::connection_pool::{PoolSettings, PoolStatus};

const MIN_REAP_INTERVAL: Duration = Duration::from_secs(1);
const MAX_REAP_INTERVAL: Duration = Duration::from_secs(30);

/// Assemble a key/value DSN from the relational config
pub fn connection_string(config: &RelationalConfig) -> String {
    let mut pairs = vec![
        ("host", config.host.clone()),
        ("port", config.port.to_string()),
        ("user", config.user.clone()),
        ("dbname", config.db_name.clone()),
        ("password", config.pass.clone()),
        ("sslmode", config.sslmode.clone()),
    ];
    if !config.time_zone.is_empty() {
        pairs.push(("options", format!("-c TimeZone={}", config.time_zone)));
    }

    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, quote_value(&value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_value(value: &str) -> String {
    if value.is_empty() || value.contains([' ', '\'', '\\']) {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    } else {
        value.to_string()
    }
}

pub struct PostgresStore {
    pool: Pool,
    settings: PoolSettings,
}

impl PostgresStore {
    /// Build the pool and apply pool limits. No connection is made yet.
    pub fn open(dsn: &str, settings: PoolSettings) -> Result<Self, AppError> {
        let pg_config: tokio_postgres::Config = dsn
            .parse()
            .map_err(|e| AppError::Connection(format!("Invalid PostgreSQL connection string: {}", e)))?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(settings.effective_max_open())
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                AppError::Connection(format!("Failed to create connection pool: {}", e))
            })?;

        spawn_reaper(&pool, settings);

        Ok(Self { pool, settings })
    }

    /// Check out a connection and run a trivial statement
    pub async fn ping(&self) -> Result<(), AppError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::Connection(format!("Failed to get connection from pool: {}", e)))?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn settings(&self) -> PoolSettings {
        self.settings
    }

    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            size: status.size,
            available: status.available,
            max_size: status.max_size,
        }
    }
}

fn reap_interval(settings: &PoolSettings) -> Duration {
    settings
        .lifetime()
        .map(|lifetime| lifetime.clamp(MIN_REAP_INTERVAL, MAX_REAP_INTERVAL))
        .unwrap_or(MAX_REAP_INTERVAL)
}

/// Periodically drops idle connections past their lifetime or beyond the idle cap.
/// The task holds a weak reference and stops once the store's pool is dropped.
fn spawn_reaper(pool: &Pool, settings: PoolSettings) {
    let period = reap_interval(&settings);
    let weak = pool.weak();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(pool) = weak.upgrade() else {
                break;
            };
            if pool.is_closed() {
                break;
            }
            let removed = reap(&pool, &settings);
            if removed > 0 {
                tracing::debug!("Closed {} idle postgres connections", removed);
            }
        }
    });
}

/// Whether an idle connection of `age` stays, given `kept` already retained
fn keep_idle(age: Duration, kept: usize, max_idle: usize, lifetime: Option<Duration>) -> bool {
    if lifetime.is_some_and(|max| age >= max) {
        return false;
    }
    kept < max_idle
}

fn reap(pool: &Pool, settings: &PoolSettings) -> usize {
    let max_idle = settings.effective_max_idle();
    let lifetime = settings.lifetime();
    let mut kept = 0;

    let result = pool.retain(|_, metrics| {
        let keep = keep_idle(metrics.age(), kept, max_idle, lifetime);
        if keep {
            kept += 1;
        }
        keep
    });

    result.removed.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RelationalConfig {
        RelationalConfig {
            driver: "postgres".to_string(),
            user: "app".to_string(),
            pass: "s3cret".to_string(),
            db_name: "appdb".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5432,
            sslmode: "disable".to_string(),
            time_zone: "Europe/Berlin".to_string(),
            max_idle_conns: 2,
            max_open_conns: 5,
            conn_max_lifetime_secs: 60,
            log_level: 4,
        }
    }

    #[test]
    fn test_connection_string() {
        let dsn = connection_string(&test_config());
        assert_eq!(
            dsn,
            "host=127.0.0.1 port=5432 user=app dbname=appdb password=s3cret sslmode=disable options='-c TimeZone=Europe/Berlin'"
        );
        assert!(dsn.parse::<tokio_postgres::Config>().is_ok());
    }

    #[test]
    fn test_connection_string_quotes_special_values() {
        let mut config = test_config();
        config.pass = "it's a secret".to_string();
        config.time_zone = String::new();

        let dsn = connection_string(&config);
        assert!(dsn.contains(r"password='it\'s a secret'"));
        assert!(!dsn.contains("options"));

        let parsed: tokio_postgres::Config = dsn.parse().unwrap();
        assert_eq!(parsed.get_password(), Some("it's a secret".as_bytes()));
    }

    #[test]
    fn test_invalid_sslmode_rejected() {
        let mut config = test_config();
        config.sslmode = "sometimes".to_string();
        let dsn = connection_string(&config);
        assert!(dsn.parse::<tokio_postgres::Config>().is_err());
    }

    #[tokio::test]
    async fn test_open_applies_pool_settings() {
        let settings = PoolSettings::new(2, 5, Duration::from_secs(60));
        let store = PostgresStore::open(&connection_string(&test_config()), settings).unwrap();

        assert_eq!(store.settings(), settings);
        assert_eq!(store.status().max_size, 5);
        assert_eq!(store.status().size, 0);
    }

    #[tokio::test]
    async fn test_reap_on_empty_pool() {
        let settings = PoolSettings::new(0, 3, Duration::from_secs(1));
        let store = PostgresStore::open(&connection_string(&test_config()), settings).unwrap();
        assert_eq!(reap(store.pool(), &settings), 0);
    }

    #[tokio::test]
    async fn test_reaper_releases_dropped_pool() {
        let settings = PoolSettings::new(1, 2, Duration::from_secs(1));
        let store = PostgresStore::open(&connection_string(&test_config()), settings).unwrap();
        let weak = store.pool().weak();

        drop(store);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_keep_idle_caps_idle_connections() {
        let young = Duration::from_secs(5);
        let lifetime = Some(Duration::from_secs(60));
        assert!(keep_idle(young, 0, 2, lifetime));
        assert!(keep_idle(young, 1, 2, lifetime));
        assert!(!keep_idle(young, 2, 2, lifetime));
        assert!(!keep_idle(young, 0, 0, lifetime));
    }

    #[test]
    fn test_keep_idle_expires_old_connections() {
        let lifetime = Some(Duration::from_secs(60));
        assert!(!keep_idle(Duration::from_secs(60), 0, 5, lifetime));
        assert!(!keep_idle(Duration::from_secs(600), 0, 5, lifetime));
        // zero lifetime never expires by age
        assert!(keep_idle(Duration::from_secs(86_400), 0, 5, None));
    }

    #[test]
    fn test_reap_interval_bounds() {
        let short = PoolSettings::new(1, 1, Duration::from_millis(10));
        let long = PoolSettings::new(1, 1, Duration::from_secs(3600));
        let forever = PoolSettings::new(1, 1, Duration::ZERO);
        assert_eq!(reap_interval(&short), MIN_REAP_INTERVAL);
        assert_eq!(reap_interval(&long), MAX_REAP_INTERVAL);
        assert_eq!(reap_interval(&forever), MAX_REAP_INTERVAL);
    }
}
