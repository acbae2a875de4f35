//! Studio configuration
//!
//! Loaded from a JSON file, then overridden from the environment.

use std::path::Path;
use std::time::Duration;

use node_catalog::CatalogConfig;
use serde::{Deserialize, Serialize};
use tokio::fs;
use workflow_graph::DEFAULT_UNDO_DEPTH;

use crate::constants::{defaults, env};
use crate::error::{Result, StudioError};

/// Workflow service connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Base URL of the workflow service
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token for the workflow service
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_api_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Repeated save requests inside this window are collapsed
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
}

fn default_api_url() -> String {
    defaults::API_URL.to_string()
}

fn default_api_timeout_ms() -> u64 {
    defaults::API_TIMEOUT_MS
}

fn default_save_debounce_ms() -> u64 {
    defaults::SAVE_DEBOUNCE_MS
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            request_timeout_ms: default_api_timeout_ms(),
            save_debounce_ms: default_save_debounce_ms(),
        }
    }
}

impl PersistenceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

/// Editing behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Validate after every structural change
    #[serde(default = "default_auto_validate")]
    pub auto_validate: bool,
    /// Undo snapshots kept
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,
}

fn default_auto_validate() -> bool {
    defaults::AUTO_VALIDATE
}

fn default_undo_depth() -> usize {
    DEFAULT_UNDO_DEPTH
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            auto_validate: default_auto_validate(),
            undo_depth: default_undo_depth(),
        }
    }
}

/// Complete configuration of an editor session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

impl StudioConfig {
    /// Load configuration from a JSON file
    ///
    /// A missing file yields the defaults. Environment overrides are
    /// applied either way.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path).await?;
            serde_json::from_str(&contents).map_err(|e| {
                StudioError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents).await?;
        log::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply `STUDIO_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(env::DISCOVERY_URL) {
            self.catalog.discovery_url = Some(url);
        }
        if let Some(token) = get(env::DISCOVERY_TOKEN) {
            self.catalog.discovery_token = Some(token);
        }
        if let Some(host) = get(env::PLUGIN_HOST) {
            self.catalog.plugin_host = Some(host);
        }
        if let Some(url) = get(env::API_URL) {
            self.persistence.api_url = url;
        }
        if let Some(token) = get(env::API_TOKEN) {
            self.persistence.api_token = Some(token);
        }
    }
}
