// Backend handles owned by the composition root
//
// Relational and cache failures go to the fatal hook; document store failures
// are returned. Initialization is expected to run once, sequentially, before
// the handles are shared.

use crate::config::{CacheConfig, Config, DocumentStoreConfig, RelationalConfig};
use crate::error::{StartupFailure, StartupStep};
use crate::models::{BackendKind, BackendStatus};
use crate::services::cache::CacheClient;
use crate::services::database::Database;
use crate::services::document_store::{DocumentClient, DocumentInitError};

/// Invoked for unrecoverable startup failures; never returns
pub type FatalHook = fn(&StartupFailure) -> !;

/// Default fatal hook: log the failing step and exit the process
pub fn exit_process(failure: &StartupFailure) -> ! {
    tracing::error!(
        step = failure.step.as_str(),
        code = failure.step.code(),
        error_code = failure.source.code(),
        "{}",
        failure
    );
    std::process::exit(1)
}

struct Slot<T> {
    handle: Option<T>,
    status: BackendStatus,
}

impl<T> Slot<T> {
    fn new(kind: BackendKind) -> Self {
        Self {
            handle: None,
            status: BackendStatus::new(kind),
        }
    }

    fn begin(&mut self) {
        if self.handle.is_some() {
            tracing::warn!("Re-initializing {} backend; previous handle is replaced", self.status.backend);
        }
        self.status.mark_configuring();
    }

    fn publish(&mut self, handle: T) -> &T {
        self.status.mark_ready();
        self.handle.insert(handle)
    }
}

pub struct Backends {
    relational: Slot<Database>,
    cache: Slot<CacheClient>,
    documents: Slot<DocumentClient>,
    fatal: FatalHook,
}

impl Backends {
    pub fn new() -> Self {
        Self::with_fatal_hook(exit_process)
    }

    pub fn with_fatal_hook(fatal: FatalHook) -> Self {
        Self {
            relational: Slot::new(BackendKind::Relational),
            cache: Slot::new(BackendKind::Cache),
            documents: Slot::new(BackendKind::DocumentStore),
            fatal,
        }
    }

    /// Open the relational store; any failure goes to the fatal hook
    pub async fn init_relational(&mut self, config: &RelationalConfig) -> &Database {
        self.relational.begin();
        match Database::open(config).await {
            Ok(db) => self.relational.publish(db),
            Err(failure) => {
                self.relational.status.mark_failed(&failure);
                (self.fatal)(&failure)
            }
        }
    }

    /// The published relational handle, `None` before initialization
    pub fn relational(&self) -> Option<&Database> {
        self.relational.handle.as_ref()
    }

    /// Build the cache pool; any failure, including the deadline, goes to the fatal hook
    pub async fn init_cache(&mut self, config: &CacheConfig) -> &CacheClient {
        self.cache.begin();
        match CacheClient::connect(config).await {
            Ok(client) => self.cache.publish(client),
            Err(err) => {
                let failure = StartupFailure::new(StartupStep::CachePool, err);
                self.cache.status.mark_failed(&failure);
                (self.fatal)(&failure)
            }
        }
    }

    pub fn cache(&self) -> Option<&CacheClient> {
        self.cache.handle.as_ref()
    }

    /// Connect the document store. Failures are returned; the slot stays empty.
    pub async fn init_document_store(
        &mut self,
        config: &DocumentStoreConfig,
    ) -> Result<&DocumentClient, DocumentInitError> {
        self.documents.begin();
        match DocumentClient::connect(config).await {
            Ok(client) => Ok(self.documents.publish(client)),
            Err(err) => {
                tracing::error!("Document store initialization failed: {}", err);
                self.documents.status.mark_failed(&err);
                Err(err)
            }
        }
    }

    pub fn document_store(&self) -> Option<&DocumentClient> {
        self.documents.handle.as_ref()
    }

    /// Bring up the activated backends in order: relational, cache, document store
    pub async fn init_activated(&mut self, config: &Config) -> Result<(), DocumentInitError> {
        if config.activate.rdbms {
            self.init_relational(&config.rdbms).await;
        }
        if config.activate.redis {
            self.init_cache(&config.redis).await;
        }
        if config.activate.mongo {
            self.init_document_store(&config.mongo).await?;
        }
        Ok(())
    }

    pub fn status(&self, kind: BackendKind) -> &BackendStatus {
        match kind {
            BackendKind::Relational => &self.relational.status,
            BackendKind::Cache => &self.cache.status,
            BackendKind::DocumentStore => &self.documents.status,
        }
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackendState;
    use std::time::Duration;
    use tempfile::tempdir;

    fn panic_on_fatal(failure: &StartupFailure) -> ! {
        panic!("fatal: {}", failure)
    }

    fn sqlite_config(path: &str) -> RelationalConfig {
        RelationalConfig {
            driver: "sqlite3".to_string(),
            user: String::new(),
            pass: String::new(),
            db_name: path.to_string(),
            host: String::new(),
            port: 0,
            sslmode: String::new(),
            time_zone: String::new(),
            max_idle_conns: 2,
            max_open_conns: 4,
            conn_max_lifetime_secs: 30,
            log_level: 4,
        }
    }

    #[test]
    fn test_accessors_before_init() {
        let backends = Backends::with_fatal_hook(panic_on_fatal);
        assert!(backends.relational().is_none());
        assert!(backends.cache().is_none());
        assert!(backends.document_store().is_none());
        assert_eq!(backends.status(BackendKind::Cache).state, BackendState::Unconfigured);
    }

    #[tokio::test]
    async fn test_init_relational_publishes_same_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let mut backends = Backends::with_fatal_hook(panic_on_fatal);

        let published: *const Database = backends
            .init_relational(&sqlite_config(path.to_str().unwrap()))
            .await;

        let db = backends.relational().unwrap();
        assert!(std::ptr::eq(published, db));
        assert_eq!(db.settings().max_open, 4);
        assert_eq!(db.settings().max_lifetime, Duration::from_secs(30));
        assert!(backends.status(BackendKind::Relational).is_ready());
    }

    #[tokio::test]
    #[should_panic(expected = "The driver oracle is not implemented yet")]
    async fn test_unsupported_driver_is_fatal() {
        let mut config = sqlite_config("never-created.db");
        config.driver = "oracle".to_string();

        let mut backends = Backends::with_fatal_hook(panic_on_fatal);
        backends.init_relational(&config).await;
    }

    #[tokio::test]
    #[should_panic(expected = "panic code: 161")]
    async fn test_cache_failure_is_fatal() {
        let config = CacheConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            pool_size: 2,
            conn_ttl: 1,
        };
        let mut backends = Backends::with_fatal_hook(panic_on_fatal);
        backends.init_cache(&config).await;
    }

    #[tokio::test]
    async fn test_document_store_failure_is_returned() {
        let config = DocumentStoreConfig {
            uri: "mongodb://127.0.0.1:1/?directConnection=true".to_string(),
            pool_size: 4,
            conn_ttl: 1,
        };
        let mut backends = Backends::with_fatal_hook(panic_on_fatal);

        let err = backends.init_document_store(&config).await.unwrap_err();
        assert!(err.client.is_some());
        assert!(backends.document_store().is_none());

        let status = backends.status(BackendKind::DocumentStore);
        assert_eq!(status.state, BackendState::Failed);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn test_reinit_replaces_handle() {
        let dir = tempdir().unwrap();
        let mut backends = Backends::with_fatal_hook(panic_on_fatal);

        let first = dir.path().join("first.db");
        backends.init_relational(&sqlite_config(first.to_str().unwrap())).await;

        let second = dir.path().join("second.db");
        let mut config = sqlite_config(second.to_str().unwrap());
        config.max_open_conns = 9;
        backends.init_relational(&config).await;

        assert_eq!(backends.relational().unwrap().settings().max_open, 9);
    }
}
