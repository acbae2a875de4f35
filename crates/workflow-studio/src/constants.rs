//! Studio-wide constants
//!
//! Single source of truth for timing defaults, endpoint paths and
//! environment variable names.

/// Default values for editor and persistence configuration
pub mod defaults {
    /// Window in which a repeated save request is collapsed into the first
    pub const SAVE_DEBOUNCE_MS: u64 = 300;
    /// Workflow service base URL when none is configured
    pub const API_URL: &str = "http://localhost:8000";
    /// Per-request timeout for the workflow service
    pub const API_TIMEOUT_MS: u64 = 10_000;
    /// Whether structural edits trigger validation
    pub const AUTO_VALIDATE: bool = true;
    /// Name given to a new, unsaved workflow
    pub const UNTITLED_WORKFLOW: &str = "Untitled workflow";
    /// Config file name inside a config directory
    pub const CONFIG_FILE: &str = "studio.json";
}

/// Workflow service paths
pub mod paths {
    pub const WORKFLOWS: &str = "/workflows";
    pub const VALIDATE: &str = "/workflows/validate";
}

/// Environment variables that override file configuration
pub mod env {
    pub const DISCOVERY_URL: &str = "STUDIO_DISCOVERY_URL";
    pub const DISCOVERY_TOKEN: &str = "STUDIO_DISCOVERY_TOKEN";
    pub const PLUGIN_HOST: &str = "STUDIO_PLUGIN_HOST";
    pub const API_URL: &str = "STUDIO_API_URL";
    pub const API_TOKEN: &str = "STUDIO_API_TOKEN";
}
