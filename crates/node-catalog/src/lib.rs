//! Node Catalog - plugin node-type discovery for the workflow editor
//!
//! This crate resolves the catalogue of node types a workflow can use.
//! Node types are supplied by an external plugin system and discovered
//! over HTTP, so the client is built to degrade rather than fail:
//!
//! - A fallback chain: primary discovery service, direct plugin-host
//!   endpoint, then a bundled catalogue shipped with the client
//! - A process-wide `RegistryCache` with a fixed TTL window
//! - Single-flight fetches: concurrent callers share one request
//! - Lenient decoding and deterministic icon sanitization
//! - Exclusion of test/demo plugins from the palette
//!
//! # Example
//!
//! ```ignore
//! use node_catalog::{CatalogConfig, RegistryCache, RegistryClient};
//!
//! let client = RegistryClient::from_config(&config, RegistryCache::shared())?;
//! let catalog = client.list_node_types(false).await?;
//! for (category, types) in catalog.by_category() {
//!     println!("{}: {}", category, types.len());
//! }
//! ```

pub mod bundled;
pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod decode;
pub mod error;
pub mod sanitize;
pub mod source;
pub mod types;

// Re-export key types
pub use bundled::bundled_node_types;
pub use cache::{CachedCatalog, RegistryCache};
pub use client::RegistryClient;
pub use config::CatalogConfig;
pub use decode::{decode_node_type, decode_payload, decode_schema};
pub use error::{CatalogError, Result};
pub use source::{DiscoverySource, HttpDiscoverySource, StaticSource};
pub use types::{Catalog, ConfigField, ConfigFieldType, ConfigSchema, NodeType};
