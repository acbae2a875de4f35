//! Catalogue-wide constants
//!
//! Single source of truth for glyphs, markers and timing defaults.

/// Neutral presentation values used when nothing better is known
pub mod glyphs {
    /// Icon shown for node types without a usable icon
    pub const DEFAULT_ICON: &str = "⚙";
    /// Color shown for node types without a usable color
    pub const DEFAULT_COLOR: &str = "#64748b";
    /// Category for node types that do not declare one
    pub const DEFAULT_CATEGORY: &str = "general";

    /// Icon values that mean "nothing chosen yet"
    pub const PLACEHOLDER_ICONS: &[&str] = &[
        "?", "❓", "default", "icon", "none", "null", "undefined", "placeholder",
    ];

    /// Color values that mean "nothing chosen yet"
    pub const PLACEHOLDER_COLORS: &[&str] =
        &["default", "none", "null", "undefined", "inherit", "placeholder"];

    /// Fragments produced when UTF-8 text is decoded as Latin-1 / cp1252
    pub const MOJIBAKE_MARKERS: &[&str] = &["\u{FFFD}", "Ã", "â€", "ðŸ", "Â"];
}

/// Markers identifying test and demo plugins
pub mod markers {
    /// Identifier tokens that flag a test/demo plugin
    pub const EXCLUDED_TOKENS: &[&str] = &["test", "demo"];
    /// Display-name prefixes that flag a test/demo plugin
    pub const EXCLUDED_NAME_PREFIXES: &[&str] = &["[test]", "[demo]"];
}

/// Default values for discovery configuration
pub mod defaults {
    /// How long a successful discovery result stays fresh
    pub const REGISTRY_TTL_SECS: u64 = 60;
    /// Per-request timeout for discovery endpoints
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
    /// Path of the direct discovery endpoint on a plugin host
    pub const DIRECT_NODES_PATH: &str = "/api/nodes";
}

/// Source identifiers
pub mod sources {
    pub const PRIMARY: &str = "primary";
    pub const DIRECT: &str = "direct";
    pub const BUNDLED: &str = "bundled";
}
