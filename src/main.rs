use db_bootstrap::config::Config;
use db_bootstrap::logging::init_tracing;
use db_bootstrap::{check_all, BackendKind, Backends, HealthCheck};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_tracing(&config.logging).map_err(|e| anyhow::anyhow!(e))?;

    // Mandatory backends exit the process on failure
    let mut backends = Backends::new();
    if let Err(err) = backends.init_activated(&config).await {
        error!("Failed to initialize document store: {}", err);
        return Err(err.into());
    }

    for kind in [BackendKind::Relational, BackendKind::Cache, BackendKind::DocumentStore] {
        let status = backends.status(kind);
        info!("{} backend: {:?}", kind, status.state);
    }

    let mut handles: Vec<&dyn HealthCheck> = Vec::new();
    if let Some(db) = backends.relational() {
        handles.push(db);
    }
    if let Some(cache) = backends.cache() {
        handles.push(cache);
    }
    if let Some(documents) = backends.document_store() {
        handles.push(documents);
    }

    let failures = check_all(&handles).await;
    if !failures.is_empty() {
        anyhow::bail!("{} backend(s) failed the health check", failures.len());
    }

    info!("All activated backends are ready");
    Ok(())
}
