// MySQL store using the mysql_async connection pool
use mysql_async::prelude::Queryable;
use mysql_async::{Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts};
use url::Url;

use crate::config::RelationalConfig;
use crate::error::AppError;
use crate::services::connection_pool::PoolSettings;

/// Assemble a `mysql://` URL; credentials are percent-encoded
pub fn connection_url(config: &RelationalConfig) -> Result<String, AppError> {
    let mut url = Url::parse(&format!(
        "mysql://{}:{}/{}",
        config.host, config.port, config.db_name
    ))
    .map_err(|e| AppError::Config(format!("Invalid MySQL URL: {}", e)))?;

    if !config.user.is_empty() {
        url.set_username(&config.user)
            .map_err(|_| AppError::Config("Invalid MySQL user".to_string()))?;
    }
    if !config.pass.is_empty() {
        url.set_password(Some(&config.pass))
            .map_err(|_| AppError::Config("Invalid MySQL password".to_string()))?;
    }

    Ok(url.to_string())
}

/// Translate pool limits into mysql_async pool options
///
/// Idle connections above the lower constraint are recycled by the pool,
/// so the lower bound carries `max_idle`.
pub(crate) fn pool_opts(settings: &PoolSettings) -> PoolOpts {
    let max = settings.effective_max_open();
    let constraints =
        PoolConstraints::new(settings.effective_max_idle(), max).unwrap_or_default();

    PoolOpts::default()
        .with_constraints(constraints)
        .with_abs_conn_ttl(settings.lifetime())
}

pub struct MySqlStore {
    pool: Pool,
    settings: PoolSettings,
}

impl MySqlStore {
    /// Build the pool and apply pool limits. Connections are opened lazily.
    pub fn open(connection_url: &str, settings: PoolSettings) -> Result<Self, AppError> {
        let opts = Opts::from_url(connection_url)
            .map_err(|e| AppError::Connection(format!("Invalid MySQL URL: {}", e)))?;
        let opts = OptsBuilder::from_opts(opts).pool_opts(pool_opts(&settings));

        Ok(Self {
            pool: Pool::new(opts),
            settings,
        })
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| AppError::Connection(format!("Failed to get MySQL connection from pool: {}", e)))?;
        conn.ping().await?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn settings(&self) -> PoolSettings {
        self.settings
    }
}
