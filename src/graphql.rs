//! GraphQL endpoint transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::config::GraphqlConfig;
use crate::extensions::InvocationError;

/// Failure of a remote call made on behalf of a run
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("GraphQL endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode GraphQL response: {0}")]
    Decode(String),

    #[error("Extension '{name}' failed: {source}")]
    Extension {
        name: String,
        #[source]
        source: InvocationError,
    },
}

/// Sends a fully substituted query document and returns the parsed response
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn execute(&self, query: &str) -> Result<JsonValue, RemoteCallError>;
}

/// HTTP transport posting `{"query": ...}` to a GraphQL endpoint
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RemoteCallError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &GraphqlConfig) -> Result<Self, RemoteCallError> {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn execute(&self, query: &str) -> Result<JsonValue, RemoteCallError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteCallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| RemoteCallError::Decode(e.to_string()))
    }
}
