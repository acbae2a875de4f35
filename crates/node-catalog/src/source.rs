//! Discovery sources
//!
//! A `DiscoverySource` is one link of the registry client's fallback chain.
//! The HTTP implementation covers both the authenticated discovery service
//! and the direct plugin-host endpoint; `StaticSource` serves a fixed list.

use std::time::Duration;

use async_trait::async_trait;

use crate::decode::decode_payload;
use crate::error::{CatalogError, Result};
use crate::types::NodeType;

/// A place node types can be discovered from
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Stable identifier, also used as the cache key
    fn id(&self) -> &str;

    /// Fetch the node types this source currently offers
    async fn fetch(&self) -> Result<Vec<NodeType>>;
}

/// Discovery over HTTP (`GET <url>` returning `{ nodes: [...] }`)
pub struct HttpDiscoverySource {
    id: String,
    url: String,
    bearer_token: Option<String>,
    http_client: reqwest::Client,
}

impl HttpDiscoverySource {
    /// Create a source with its own HTTP client
    pub fn new(id: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(id, url, http_client))
    }

    /// Create a source sharing an existing HTTP client
    pub fn with_client(
        id: impl Into<String>,
        url: impl Into<String>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            bearer_token: None,
            http_client,
        }
    }

    /// Authenticate requests with a bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DiscoverySource for HttpDiscoverySource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<Vec<NodeType>> {
        let mut request = self.http_client.get(&self.url);
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::transport(&self.id, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect::<String>();
            return Err(CatalogError::Status {
                source_id: self.id.clone(),
                status: status.as_u16(),
                detail,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CatalogError::malformed(&self.id, e.to_string()))?;

        let types = decode_payload(&self.id, &payload)?;
        log::debug!("Source '{}' returned {} node types", self.id, types.len());
        Ok(types)
    }
}

/// A source serving a fixed list of node types
pub struct StaticSource {
    id: String,
    types: Vec<NodeType>,
}

impl StaticSource {
    pub fn new(id: impl Into<String>, types: Vec<NodeType>) -> Self {
        Self {
            id: id.into(),
            types,
        }
    }
}

#[async_trait]
impl DiscoverySource for StaticSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<Vec<NodeType>> {
        Ok(self.types.clone())
    }
}
