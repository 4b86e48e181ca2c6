// Liveness checks shared by the backend handles
use crate::error::AppError;
use crate::services::cache::CacheClient;
use crate::services::database::Database;
use crate::services::document_store::DocumentClient;

/// Health check trait - one round trip to the backend
#[async_trait::async_trait]
pub trait HealthCheck: Send + Sync {
    /// Backend name for diagnostics
    fn backend(&self) -> &str;

    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait::async_trait]
impl HealthCheck for Database {
    fn backend(&self) -> &str {
        self.driver().as_str()
    }

    async fn ping(&self) -> Result<(), AppError> {
        Database::ping(self).await
    }
}

#[async_trait::async_trait]
impl HealthCheck for CacheClient {
    fn backend(&self) -> &str {
        "redis"
    }

    async fn ping(&self) -> Result<(), AppError> {
        CacheClient::ping(self).await
    }
}

#[async_trait::async_trait]
impl HealthCheck for DocumentClient {
    fn backend(&self) -> &str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), AppError> {
        DocumentClient::ping(self).await
    }
}

/// Ping every handle, returning the backends that failed
pub async fn check_all(handles: &[&dyn HealthCheck]) -> Vec<(String, AppError)> {
    let mut failures = Vec::new();
    for handle in handles {
        if let Err(err) = handle.ping().await {
            tracing::warn!("Health check failed for {}: {}", handle.backend(), err);
            failures.push((handle.backend().to_string(), err));
        }
    }
    failures
}
