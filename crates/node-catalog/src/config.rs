//! Discovery configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Where and how to discover node types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Primary discovery endpoint (authenticated indirection service)
    #[serde(default)]
    pub discovery_url: Option<String>,
    /// Bearer token for the primary endpoint
    #[serde(default)]
    pub discovery_token: Option<String>,
    /// Plugin host base URL; `/api/nodes` is appended for direct discovery
    #[serde(default)]
    pub plugin_host: Option<String>,
    /// Freshness window for cached results
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_ttl_secs() -> u64 {
    defaults::REGISTRY_TTL_SECS
}

fn default_request_timeout_ms() -> u64 {
    defaults::REQUEST_TIMEOUT_MS
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            discovery_url: None,
            discovery_token: None,
            plugin_host: None,
            ttl_secs: default_ttl_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl CatalogConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Direct discovery URL derived from the plugin host
    pub fn direct_url(&self) -> Option<String> {
        self.plugin_host.as_ref().map(|host| {
            format!(
                "{}{}",
                host.trim_end_matches('/'),
                defaults::DIRECT_NODES_PATH
            )
        })
    }
}
