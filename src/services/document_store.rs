// Document Store Client
//
// MongoDB client with a pinned server API version. Unlike the relational and
// cache initializers, failures here are returned to the caller.

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::Client;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::DocumentStoreConfig;
use crate::error::AppError;

/// Step of the document store setup that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStep {
    Construct,
    Connect,
    Ping,
}

impl fmt::Display for DocumentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentStep::Construct => "construct",
            DocumentStep::Connect => "connect",
            DocumentStep::Ping => "ping",
        })
    }
}

/// Recoverable setup failure carrying the partially built client
#[derive(Debug, Error)]
#[error("document store {step} failed: {source}")]
pub struct DocumentInitError {
    pub step: DocumentStep,
    /// `None` only when construction itself failed
    pub client: Option<DocumentClient>,
    #[source]
    pub source: AppError,
}

#[derive(Debug, Clone)]
pub struct DocumentClient {
    client: Client,
    deadline: Duration,
    max_pool_size: u32,
}

impl DocumentClient {
    /// Construct the client, perform the handshake and ping, each step bounded by `conn_ttl`
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self, DocumentInitError> {
        let deadline = config.conn_ttl();

        let client = Self::construct(config, deadline)
            .await
            .map_err(|source| DocumentInitError {
                step: DocumentStep::Construct,
                client: None,
                source,
            })?;

        if let Err(source) = client.handshake().await {
            return Err(DocumentInitError {
                step: DocumentStep::Connect,
                client: Some(client),
                source,
            });
        }

        if let Err(source) = client.ping().await {
            return Err(DocumentInitError {
                step: DocumentStep::Ping,
                client: Some(client),
                source,
            });
        }

        tracing::info!("Document store connection successful");
        Ok(client)
    }

    async fn construct(config: &DocumentStoreConfig, deadline: Duration) -> Result<Self, AppError> {
        // SRV lookups during parsing may touch the network
        let mut options = bounded(deadline, async {
            ClientOptions::parse(config.uri.as_str()).await.map_err(AppError::from)
        })
        .await?;

        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        options.max_pool_size = Some(config.pool_size);
        options.server_selection_timeout = Some(deadline);
        options.connect_timeout = Some(deadline);

        tracing::info!(
            "Creating document store client (max_pool_size: {}, deadline: {:?})",
            config.pool_size,
            deadline
        );

        let client = Client::with_options(options)?;
        Ok(Self {
            client,
            deadline,
            max_pool_size: config.pool_size,
        })
    }

    /// Select a server and complete the connection handshake
    async fn handshake(&self) -> Result<(), AppError> {
        let admin = self.client.database("admin");
        bounded(self.deadline, async {
            admin.run_command(doc! { "hello": 1 }).await?;
            Ok(())
        })
        .await
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        let admin = self.client.database("admin");
        bounded(self.deadline, async {
            admin.run_command(doc! { "ping": 1 }).await?;
            Ok(())
        })
        .await
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }
}

async fn bounded<T, F>(deadline: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| AppError::Timeout(deadline))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn test_config(uri: &str, conn_ttl: u64) -> DocumentStoreConfig {
        DocumentStoreConfig {
            uri: uri.to_string(),
            pool_size: 8,
            conn_ttl,
        }
    }

    #[tokio::test]
    async fn test_invalid_uri_fails_construction() {
        let err = DocumentClient::connect(&test_config("not-a-mongo-uri", 1))
            .await
            .unwrap_err();
        assert_eq!(err.step, DocumentStep::Construct);
        assert!(err.client.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_uri_returns_client_and_error() {
        let config = test_config("mongodb://127.0.0.1:1/?directConnection=true", 1);
        let start = Instant::now();

        let err = DocumentClient::connect(&config).await.unwrap_err();
        assert_eq!(err.step, DocumentStep::Connect);
        assert!(start.elapsed() < Duration::from_secs(3));

        let client = err.client.expect("client is kept on connect failure");
        assert_eq!(client.max_pool_size(), 8);
    }

    #[tokio::test]
    async fn test_live_server_answers_ping() {
        let Ok(uri) = std::env::var("TEST_MONGO_URI") else {
            return;
        };
        let client = DocumentClient::connect(&test_config(&uri, 5)).await.unwrap();
        assert!(client.ping().await.is_ok());
    }
}
