//! Document store client
//!
//! The pipeline only needs one call from the store: submit a rendered bulk body and get
//! the status and raw response body back. Interpreting the response is the bulk
//! writer's job.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use thiserror::Error;

use crate::settings::OpenSearchSettings;

/// Content type of the bulk endpoint.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to build store client: {0}")]
    Client(String),

    #[error("failed to execute bulk request: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Raw bulk response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkResponse {
    pub status: u16,
    pub body: String,
}

/// Bulk submission seam, shared by every running job
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn bulk(&self, payload: String) -> Result<BulkResponse, StoreError>;
}

/// OpenSearch over HTTP
#[derive(Debug, Clone)]
pub struct OpenSearchClient {
    client: Client,
    bulk_url: String,
    username: String,
    password: String,
}

impl OpenSearchClient {
    pub fn new(settings: &OpenSearchSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;

        Ok(Self {
            client,
            bulk_url: format!("{}/_bulk", settings.address.trim_end_matches('/')),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    pub fn bulk_url(&self) -> &str {
        &self.bulk_url
    }
}

#[async_trait]
impl DocumentStore for OpenSearchClient {
    async fn bulk(&self, payload: String) -> Result<BulkResponse, StoreError> {
        let mut request = self
            .client
            .post(&self.bulk_url)
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(payload);

        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(BulkResponse { status, body })
    }
}
