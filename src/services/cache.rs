// Cache Client
//
// Pooled client to a single Redis-compatible endpoint. The whole pool is
// dialed up front under the configured deadline.

use deadpool_redis::{redis, Config as PoolConfig, Pool, PoolConfig as PoolLimits, Runtime};
use futures::future::try_join_all;

use crate::config::CacheConfig;
use crate::error::AppError;
use crate::services::connection_pool::PoolStatus;

pub struct CacheClient {
    pool: Pool,
    endpoint: String,
}

impl CacheClient {
    /// Build the pool and open `pool_size` connections within `conn_ttl`
    pub async fn connect(config: &CacheConfig) -> Result<Self, AppError> {
        let endpoint = config.endpoint();
        if config.pool_size == 0 {
            return Err(AppError::Config(format!(
                "Cache pool size for {} must be at least 1",
                endpoint
            )));
        }

        let mut cfg = PoolConfig::from_url(format!("redis://{}", endpoint));
        cfg.pool = Some(PoolLimits::new(config.pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AppError::Cache(format!("Failed to create cache pool: {}", e)))?;

        let deadline = config.conn_ttl();
        tracing::info!(
            "Creating cache pool for {} (size: {}, deadline: {:?})",
            endpoint,
            config.pool_size,
            deadline
        );

        tokio::time::timeout(deadline, fill(&pool, config.pool_size))
            .await
            .map_err(|_| AppError::Timeout(deadline))??;

        tracing::info!("Cache pool connection successful: {}", endpoint);
        Ok(Self { pool, endpoint })
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AppError::Cache(format!("Failed to get cache connection: {}", e)))?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(AppError::Cache(format!("Unexpected PING reply: {}", pong)));
        }
        Ok(())
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Maximum number of pooled connections
    pub fn capacity(&self) -> usize {
        self.pool.status().max_size
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

/// Check out `size` connections at once so each one is dialed, then return them
async fn fill(pool: &Pool, size: usize) -> Result<(), AppError> {
    let conns = try_join_all((0..size).map(|_| pool.get()))
        .await
        .map_err(|e| AppError::Cache(format!("Failed to open cache connection: {}", e)))?;
    drop(conns);
    Ok(())
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("endpoint", &self.endpoint)
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn test_config(host: &str, port: u16, pool_size: usize, conn_ttl: u64) -> CacheConfig {
        CacheConfig {
            host: host.to_string(),
            port,
            pool_size,
            conn_ttl,
        }
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_within_deadline() {
        // non-routable address: either refused quickly or cut off by the deadline
        let config = test_config("10.255.255.1", 6379, 4, 1);
        let start = Instant::now();

        let result = CacheClient::connect(&config).await;
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(1) + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_refused_port_fails() {
        let config = test_config("127.0.0.1", 1, 2, 2);
        let err = CacheClient::connect(&config).await.unwrap_err();
        assert!(matches!(err, AppError::Cache(_) | AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_zero_pool_size_rejected() {
        let config = test_config("127.0.0.1", 1, 0, 1);
        let err = CacheClient::connect(&config).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_pool_capacity_against_live_server() {
        let Ok(host) = std::env::var("TEST_REDIS_HOST") else {
            return;
        };
        let config = test_config(&host, 6379, 3, 5);

        let client = CacheClient::connect(&config).await.unwrap();
        assert_eq!(client.capacity(), 3);
        assert_eq!(client.status().size, 3);
        assert!(client.ping().await.is_ok());
    }
}
