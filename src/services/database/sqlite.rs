use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::services::connection_pool::PoolSettings;

/// SQLite file database
/// Uses tokio::Mutex for async-friendly locking
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    settings: PoolSettings,
}

impl SqliteStore {
    /// Open (or create) the database file with foreign key enforcement off
    pub async fn open<P: AsRef<Path>>(db_path: P, settings: PoolSettings) -> Result<Self, AppError> {
        // Handle SQLite URL format (sqlite:./path or sqlite://path)
        let path_str = db_path.as_ref().to_string_lossy();
        let clean_path: &str = if path_str.starts_with("sqlite:") {
            path_str.trim_start_matches("sqlite:").trim_start_matches("//")
        } else {
            path_str.as_ref()
        };

        let conn = Connection::open(clean_path)?;
        conn.execute_batch("PRAGMA foreign_keys = OFF")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(clean_path),
            settings,
        })
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub async fn foreign_keys_enabled(&self) -> Result<bool, AppError> {
        let conn = self.conn.lock().await;
        let enabled: i64 = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
        Ok(enabled != 0)
    }

    /// Get a reference to the connection (for use in async contexts)
    pub fn get_conn(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Limits as configured; the single connection is serialized by the mutex
    pub fn settings(&self) -> PoolSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sqlite_store_creation() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let settings = PoolSettings::new(1, 1, Duration::ZERO);

        let store = SqliteStore::open(&db_path, settings).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(store.path(), db_path.as_path());
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_keys_disabled() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("fk.db"), PoolSettings::new(1, 1, Duration::ZERO))
            .await
            .unwrap();
        assert!(!store.foreign_keys_enabled().await.unwrap());

        // A dangling reference is accepted while enforcement is off
        let conn = store.get_conn();
        let conn = conn.lock().await;
        conn.execute_batch(
            r#"
            CREATE TABLE parents (id INTEGER PRIMARY KEY);
            CREATE TABLE children (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parents(id));
            INSERT INTO children (id, parent_id) VALUES (1, 42);
            "#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_url_prefix_is_stripped() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("prefixed.db");
        let url = format!("sqlite://{}", db_path.display());

        let store = SqliteStore::open(&url, PoolSettings::new(1, 1, Duration::ZERO)).await.unwrap();
        assert_eq!(store.path(), db_path.as_path());
    }

    #[tokio::test]
    async fn test_open_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("missing").join("test.db");
        let result = SqliteStore::open(&db_path, PoolSettings::new(1, 1, Duration::ZERO)).await;
        assert!(result.is_err());
    }
}
