//! Presentation-value sanitization
//!
//! All functions here are pure: the same input always yields the same
//! output, so a corrupt icon renders identically on every load.

use crate::constants::{glyphs, markers};
use crate::types::NodeType;

/// Whether text shows signs of an encoding accident
pub fn is_corrupted(value: &str) -> bool {
    glyphs::MOJIBAKE_MARKERS.iter().any(|m| value.contains(m))
}

fn is_listed(value: &str, list: &[&str]) -> bool {
    let lowered = value.to_lowercase();
    list.iter().any(|p| *p == lowered)
}

/// An icon the editor should display as-is
///
/// Empty, placeholder, default-glyph and corrupted values are not usable.
pub fn is_usable_icon(icon: &str) -> bool {
    let icon = icon.trim();
    !icon.is_empty()
        && icon != glyphs::DEFAULT_ICON
        && !is_listed(icon, glyphs::PLACEHOLDER_ICONS)
        && !is_corrupted(icon)
}

/// A color the editor should display as-is
pub fn is_usable_color(color: &str) -> bool {
    let color = color.trim();
    !color.is_empty()
        && color != glyphs::DEFAULT_COLOR
        && !is_listed(color, glyphs::PLACEHOLDER_COLORS)
        && !is_corrupted(color)
}

/// A display name that is more than an echo of the type id
pub fn is_usable_name(name: &str, type_id: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != type_id && !is_corrupted(name)
}

/// Normalize an icon string, falling back to the neutral glyph
pub fn sanitize_icon(icon: &str) -> String {
    if is_usable_icon(icon) {
        icon.trim().to_string()
    } else {
        glyphs::DEFAULT_ICON.to_string()
    }
}

/// Normalize an icon of unknown JSON shape
///
/// Non-string values (numbers, objects, null) become the neutral glyph.
pub fn sanitize_icon_value(value: Option<&serde_json::Value>) -> String {
    match value.and_then(|v| v.as_str()) {
        Some(s) => sanitize_icon(s),
        None => glyphs::DEFAULT_ICON.to_string(),
    }
}

/// Normalize a color string, falling back to the neutral color
pub fn sanitize_color(color: &str) -> String {
    if is_usable_color(color) {
        color.trim().to_string()
    } else {
        glyphs::DEFAULT_COLOR.to_string()
    }
}

/// Turn a type id into a readable fallback name ("core.http_request" -> "Http Request")
pub fn humanize_type_id(type_id: &str) -> String {
    let tail = type_id.rsplit(['.', '/', ':']).next().unwrap_or(type_id);
    let words: Vec<String> = tail
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        type_id.to_string()
    } else {
        words.join(" ")
    }
}

fn has_excluded_token(identifier: &str) -> bool {
    identifier
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| is_listed(token, markers::EXCLUDED_TOKENS))
}

/// Whether a node type belongs to a test or demo plugin
///
/// Matches whole identifier tokens ("demo.echo", "acme-test-node") and
/// bracketed name prefixes ("[Test] Echo"), never substrings such as
/// "attestation".
pub fn is_test_or_demo(node_type: &NodeType) -> bool {
    if has_excluded_token(&node_type.type_id) || has_excluded_token(&node_type.plugin_id) {
        return true;
    }
    let name = node_type.display_name.trim().to_lowercase();
    markers::EXCLUDED_NAME_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}
