//! Node enrichment
//!
//! Fills in presentation metadata on graph nodes from the node-type
//! catalogue. The precedence rule is the same for freshly dropped nodes
//! and for nodes loaded from storage:
//!
//! 1. A usable value already on the node wins.
//! 2. Otherwise the catalogue's usable value applies.
//! 3. Otherwise the neutral default applies.
//!
//! Config values are never touched here. Enrichment cannot fail: a node
//! that matches nothing still comes out with neutral defaults.

use node_catalog::constants::glyphs;
use node_catalog::sanitize::{humanize_type_id, is_corrupted, is_usable_color, is_usable_icon, is_usable_name};
use node_catalog::{Catalog, NodeType, RegistryClient};

use crate::legacy::LegacyTypeTable;
use crate::types::{DisplayData, GraphNode};

/// How a node's type was matched to a catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Same type id
    Exact,
    /// The catalogue type id contains the node's type id
    Containment,
    /// Found through the legacy type table
    Legacy,
}

/// Look up a node type by exact id, then by containment
///
/// Containment supports namespaced ids: a node of type "http_request"
/// matches "core.http_request". When several ids contain the node's type,
/// the shortest wins, ties broken alphabetically. An empty type id never
/// matches.
pub fn find_node_type<'a>(catalog: &'a Catalog, type_id: &str) -> Option<&'a NodeType> {
    find_match(catalog, type_id).map(|(ty, _)| ty)
}

fn find_match<'a>(catalog: &'a Catalog, type_id: &str) -> Option<(&'a NodeType, MatchKind)> {
    let needle = type_id.trim();
    if needle.is_empty() {
        return None;
    }
    if let Some(ty) = catalog.get(needle) {
        return Some((ty, MatchKind::Exact));
    }
    catalog
        .iter()
        .filter(|ty| ty.type_id.contains(needle))
        .min_by(|a, b| {
            a.type_id
                .len()
                .cmp(&b.type_id.len())
                .then_with(|| a.type_id.cmp(&b.type_id))
        })
        .map(|ty| (ty, MatchKind::Containment))
}

/// Resolves node types and merges catalogue metadata into nodes
#[derive(Debug, Clone, Default)]
pub struct NodeEnricher {
    legacy: LegacyTypeTable,
}

impl NodeEnricher {
    /// Create an enricher with the built-in legacy table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_legacy_table(legacy: LegacyTypeTable) -> Self {
        Self { legacy }
    }

    /// Match a type id: exact, then containment, then legacy name
    pub fn resolve<'a>(&self, catalog: &'a Catalog, type_id: &str) -> Option<(&'a NodeType, MatchKind)> {
        if let Some(found) = find_match(catalog, type_id) {
            return Some(found);
        }
        let expected = self.legacy.display_name_for(type_id)?;
        catalog
            .iter()
            .find(|ty| ty.display_name.eq_ignore_ascii_case(expected))
            .map(|ty| (ty, MatchKind::Legacy))
    }

    /// Enrich a list of nodes
    pub fn enrich(&self, mut nodes: Vec<GraphNode>, catalog: Option<&Catalog>) -> Vec<GraphNode> {
        for node in &mut nodes {
            self.enrich_node(node, catalog);
        }
        nodes
    }

    /// Enrich one node in place; returns whether anything changed
    pub fn enrich_node(&self, node: &mut GraphNode, catalog: Option<&Catalog>) -> bool {
        let matched = catalog.and_then(|c| self.resolve(c, &node.type_id));
        if let Some((ty, kind)) = matched {
            if kind != MatchKind::Exact {
                log::debug!(
                    "Matched node '{}' of type '{}' to '{}' ({:?})",
                    node.id,
                    node.type_id,
                    ty.type_id,
                    kind
                );
            }
        }
        let before = node.display_data.clone();
        merge_display(&mut node.display_data, &node.type_id, matched.map(|(ty, _)| ty));
        node.display_data != before
    }
}

/// Fill neutral defaults without consulting any catalogue
pub fn apply_defaults(node: &mut GraphNode) -> bool {
    let before = node.display_data.clone();
    merge_display(&mut node.display_data, &node.type_id, None);
    node.display_data != before
}

/// Apply the existing-wins, registry-fallback, default-last rule
pub fn merge_display(display: &mut DisplayData, type_id: &str, registry: Option<&NodeType>) {
    // A humanized type id is the name default, so the catalogue may replace it
    if !is_usable_name(&display.name, type_id) || display.name == humanize_type_id(type_id) {
        display.name = registry
            .map(|ty| ty.display_name.trim())
            .filter(|name| is_usable_name(name, type_id))
            .map(str::to_string)
            .unwrap_or_else(|| humanize_type_id(type_id));
    }

    if display.description.trim().is_empty() || is_corrupted(&display.description) {
        let description = registry
            .map(|ty| ty.description.trim())
            .filter(|d| !d.is_empty() && !is_corrupted(d))
            .unwrap_or_default();
        display.description = description.to_string();
    }

    fill(
        &mut display.icon,
        registry.map(|ty| ty.icon.as_str()),
        is_usable_icon,
        glyphs::DEFAULT_ICON,
    );
    fill(
        &mut display.color,
        registry.map(|ty| ty.color.as_str()),
        is_usable_color,
        glyphs::DEFAULT_COLOR,
    );
    fill(
        &mut display.category,
        registry.map(|ty| ty.category.as_str()),
        |c| !c.trim().is_empty() && c.trim() != glyphs::DEFAULT_CATEGORY && !is_corrupted(c),
        glyphs::DEFAULT_CATEGORY,
    );

    let has_schema = display
        .config_schema
        .as_ref()
        .is_some_and(|schema| !schema.is_empty());
    if !has_schema {
        if let Some(ty) = registry.filter(|ty| !ty.config_schema.is_empty()) {
            display.config_schema = Some(ty.config_schema.clone());
        }
    }
}

fn fill(slot: &mut Option<String>, registry: Option<&str>, usable: impl Fn(&str) -> bool, default: &str) {
    if slot.as_deref().is_some_and(&usable) {
        return;
    }
    let value = registry.filter(|v| usable(v)).unwrap_or(default);
    *slot = Some(value.trim().to_string());
}

/// Fetch the catalogue, or `None` (logged) when discovery is exhausted
async fn catalog_or_none(client: &RegistryClient) -> Option<std::sync::Arc<Catalog>> {
    match client.list_node_types(false).await {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            log::warn!("Node types unavailable, applying default display data: {}", e);
            None
        }
    }
}

/// Await the registry (joining any fetch in flight) and enrich `nodes`
pub async fn enrich_with_registry(
    enricher: &NodeEnricher,
    client: &RegistryClient,
    nodes: Vec<GraphNode>,
) -> Vec<GraphNode> {
    let catalog = catalog_or_none(client).await;
    enricher.enrich(nodes, catalog.as_deref())
}
