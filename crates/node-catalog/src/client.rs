//! Plugin registry client
//!
//! Resolves the list of available node types through a fallback chain:
//!
//! 1. the primary discovery service (bearer-authenticated)
//! 2. the plugin host's direct `/api/nodes` endpoint
//! 3. the bundled catalogue shipped with the client
//!
//! A source fails on transport error, bad status, malformed payload, or an
//! empty result; its partial output is discarded and the next source is
//! tried. Successful network results are cached for the TTL window and
//! concurrent callers share one in-flight fetch.

use std::sync::Arc;

use crate::bundled::bundled_node_types;
use crate::cache::RegistryCache;
use crate::config::CatalogConfig;
use crate::constants::sources as source_ids;
use crate::error::{CatalogError, Result};
use crate::sanitize::is_test_or_demo;
use crate::source::{DiscoverySource, HttpDiscoverySource};
use crate::types::{Catalog, NodeType};

/// Client for the plugin node-type registry
pub struct RegistryClient {
    sources: Arc<Vec<Arc<dyn DiscoverySource>>>,
    fallback: Arc<Vec<NodeType>>,
    cache: Arc<RegistryCache>,
    chain_key: String,
}

impl RegistryClient {
    /// Create a client over an explicit chain, backed by `cache`
    pub fn new(sources: Vec<Arc<dyn DiscoverySource>>, cache: Arc<RegistryCache>) -> Self {
        let chain_key = sources
            .iter()
            .map(|s| s.id())
            .collect::<Vec<_>>()
            .join("|");
        Self {
            sources: Arc::new(sources),
            fallback: Arc::new(bundled_node_types()),
            cache,
            chain_key,
        }
    }

    /// Build the standard primary → direct chain from configuration
    pub fn from_config(config: &CatalogConfig, cache: Arc<RegistryCache>) -> Result<Self> {
        let timeout = config.request_timeout();
        let mut chain: Vec<Arc<dyn DiscoverySource>> = Vec::new();

        if let Some(ref url) = config.discovery_url {
            let mut primary = HttpDiscoverySource::new(source_ids::PRIMARY, url, timeout)?;
            if let Some(ref token) = config.discovery_token {
                primary = primary.with_bearer_token(token);
            }
            chain.push(Arc::new(primary));
        }
        if let Some(url) = config.direct_url() {
            chain.push(Arc::new(HttpDiscoverySource::new(source_ids::DIRECT, url, timeout)?));
        }

        if chain.is_empty() {
            log::warn!("No discovery endpoints configured; only bundled node types are available");
        }
        Ok(Self::new(chain, cache))
    }

    /// Replace the bundled fallback list
    pub fn with_fallback(mut self, fallback: Vec<NodeType>) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    pub fn cache(&self) -> &Arc<RegistryCache> {
        &self.cache
    }

    /// The freshest cached catalogue, honouring chain order
    pub fn cached(&self) -> Option<Arc<Catalog>> {
        self.sources
            .iter()
            .find_map(|source| self.cache.get_fresh(source.id()))
    }

    /// List the available node types
    ///
    /// `force_refresh` skips the cache but still walks the full fallback
    /// chain, and still attaches to a fetch that is already running.
    pub async fn list_node_types(&self, force_refresh: bool) -> Result<Arc<Catalog>> {
        if !force_refresh {
            if let Some(catalog) = self.cached() {
                log::debug!(
                    "Serving {} node types from cache ({})",
                    catalog.len(),
                    catalog.source()
                );
                return Ok(catalog);
            }
        }

        let sources = self.sources.clone();
        let fallback = self.fallback.clone();
        let cache = self.cache.clone();
        self.cache
            .single_flight(&self.chain_key, move || async move {
                resolve_chain(&sources, &fallback, &cache).await
            })
            .await
    }
}

/// Remove test/demo entries; an empty result counts as a failed source
fn finalize(source_id: &str, types: Vec<NodeType>) -> Result<Catalog> {
    let before = types.len();
    let kept: Vec<NodeType> = types.into_iter().filter(|t| !is_test_or_demo(t)).collect();
    if kept.len() < before {
        log::debug!(
            "Filtered {} test/demo node types from '{}'",
            before - kept.len(),
            source_id
        );
    }
    if kept.is_empty() {
        return Err(CatalogError::Empty(source_id.to_string()));
    }
    Ok(Catalog::new(source_id, kept))
}

async fn resolve_chain(
    sources: &[Arc<dyn DiscoverySource>],
    fallback: &[NodeType],
    cache: &RegistryCache,
) -> Result<Arc<Catalog>> {
    let mut failures = Vec::new();

    for source in sources {
        let outcome = match source.fetch().await {
            Ok(types) => finalize(source.id(), types),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(catalog) => {
                log::info!(
                    "Discovered {} node types from '{}'",
                    catalog.len(),
                    source.id()
                );
                let catalog = Arc::new(catalog);
                cache.store(source.id(), catalog.clone());
                return Ok(catalog);
            }
            Err(e) => {
                log::warn!("Discovery source '{}' failed: {}", source.id(), e);
                failures.push(e.to_string());
            }
        }
    }

    match finalize(source_ids::BUNDLED, fallback.to_vec()) {
        Ok(catalog) => {
            log::warn!(
                "Falling back to {} bundled node types",
                catalog.len()
            );
            Ok(Arc::new(catalog))
        }
        Err(e) => {
            failures.push(e.to_string());
            Err(CatalogError::Exhausted(failures.join("; ")))
        }
    }
}
