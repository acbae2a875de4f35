//! Advisory validation of workflow documents
//!
//! Validates graph structure, node configuration and document metadata.
//! Results are advisory only: nothing here blocks an edit or a save.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use node_catalog::Catalog;
use serde::{Deserialize, Serialize};

use crate::enrich::find_node_type;
use crate::events::GraphChange;
use crate::types::{GraphNode, WorkflowDocument};

/// How serious a validation issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A structural problem found by the local rules
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// An edge references a node that is not in the graph
    MissingNode { edge_id: String, node_id: String },
    /// An edge connects a node to itself
    SelfLoop { edge_id: String, node_id: String },
    /// The graph contains a cycle through these nodes
    Cycle { node_ids: Vec<String> },
    /// Two nodes share an id
    DuplicateNode { node_id: String },
    /// A required config field has no value
    MissingRequiredConfig { node_id: String, field: String },
    /// The node type is not in the catalogue
    UnknownType { node_id: String, type_id: String },
    /// A node has no connections in a multi-node graph
    OrphanedNode { node_id: String },
    /// Two edges join the same ports
    DuplicateEdge { edge_id: String },
    UnnamedWorkflow,
    EmptyWorkflow,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingNode { .. }
            | Self::SelfLoop { .. }
            | Self::Cycle { .. }
            | Self::DuplicateNode { .. }
            | Self::MissingRequiredConfig { .. } => Severity::Error,
            Self::UnknownType { .. }
            | Self::OrphanedNode { .. }
            | Self::DuplicateEdge { .. }
            | Self::UnnamedWorkflow => Severity::Warning,
            Self::EmptyWorkflow => Severity::Info,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingNode { .. } => "missing_node",
            Self::SelfLoop { .. } => "self_loop",
            Self::Cycle { .. } => "cycle",
            Self::DuplicateNode { .. } => "duplicate_node",
            Self::MissingRequiredConfig { .. } => "missing_required_config",
            Self::UnknownType { .. } => "unknown_type",
            Self::OrphanedNode { .. } => "orphaned_node",
            Self::DuplicateEdge { .. } => "duplicate_edge",
            Self::UnnamedWorkflow => "unnamed_workflow",
            Self::EmptyWorkflow => "empty_workflow",
        }
    }

    fn node_id(&self) -> Option<&str> {
        match self {
            Self::MissingNode { node_id, .. }
            | Self::SelfLoop { node_id, .. }
            | Self::DuplicateNode { node_id }
            | Self::MissingRequiredConfig { node_id, .. }
            | Self::UnknownType { node_id, .. }
            | Self::OrphanedNode { node_id } => Some(node_id),
            Self::Cycle { node_ids } => node_ids.first().map(String::as_str),
            _ => None,
        }
    }

    fn edge_id(&self) -> Option<&str> {
        match self {
            Self::MissingNode { edge_id, .. }
            | Self::SelfLoop { edge_id, .. }
            | Self::DuplicateEdge { edge_id } => Some(edge_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references missing node '{}'", edge_id, node_id)
            }
            Self::SelfLoop { node_id, .. } => {
                write!(f, "Node '{}' is connected to itself", node_id)
            }
            Self::Cycle { node_ids } => {
                write!(f, "Cycle detected through nodes: {}", node_ids.join(", "))
            }
            Self::DuplicateNode { node_id } => write!(f, "Duplicate node id '{}'", node_id),
            Self::MissingRequiredConfig { node_id, field } => {
                write!(f, "Node '{}' is missing required field '{}'", node_id, field)
            }
            Self::UnknownType { node_id, type_id } => {
                write!(f, "Node '{}' has unknown type '{}'", node_id, type_id)
            }
            Self::OrphanedNode { node_id } => {
                write!(f, "Node '{}' has no connections", node_id)
            }
            Self::DuplicateEdge { edge_id } => {
                write!(f, "Edge '{}' duplicates an existing connection", edge_id)
            }
            Self::UnnamedWorkflow => write!(f, "Workflow has no name"),
            Self::EmptyWorkflow => write!(f, "Workflow has no nodes"),
        }
    }
}

/// One reported issue, located by node and/or edge where applicable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
}

impl From<Finding> for ValidationIssue {
    fn from(finding: Finding) -> Self {
        Self {
            severity: finding.severity(),
            code: finding.code().to_string(),
            message: finding.to_string(),
            node_id: finding.node_id().map(str::to_string),
            edge_id: finding.edge_id().map(str::to_string),
        }
    }
}

/// Result of validating a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True iff there are no errors
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    #[serde(default)]
    pub infos: Vec<ValidationIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ValidationReport {
    /// Sort issues into buckets by severity
    pub fn from_issues(issues: impl IntoIterator<Item = ValidationIssue>) -> Self {
        let mut report = Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            infos: Vec::new(),
            summary: None,
        };
        for issue in issues {
            match issue.severity {
                Severity::Error => report.errors.push(issue),
                Severity::Warning => report.warnings.push(issue),
                Severity::Info => report.infos.push(issue),
            }
        }
        report.is_valid = report.errors.is_empty();
        report
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Every issue, most severe first
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.infos.iter())
    }

    /// Issues located on a node, for canvas highlighting
    pub fn for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues()
            .filter(move |i| i.node_id.as_deref() == Some(node_id))
    }

    /// Issues located on an edge
    pub fn for_edge<'a>(&'a self, edge_id: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues()
            .filter(move |i| i.edge_id.as_deref() == Some(edge_id))
    }
}

/// Validate a workflow document
///
/// Returns every finding (not just the first). Pass a catalogue to enable
/// unknown-type checks and schema lookup for nodes without a snapshot.
pub fn validate_document(document: &WorkflowDocument, catalog: Option<&Catalog>) -> ValidationReport {
    ValidationReport::from_issues(
        collect_findings(document, catalog)
            .into_iter()
            .map(ValidationIssue::from),
    )
}

/// Run every local rule over the document
pub fn collect_findings(document: &WorkflowDocument, catalog: Option<&Catalog>) -> Vec<Finding> {
    let mut findings = Vec::new();

    if document.name.trim().is_empty() {
        findings.push(Finding::UnnamedWorkflow);
    }
    if document.nodes.is_empty() {
        findings.push(Finding::EmptyWorkflow);
    }

    check_duplicate_nodes(document, &mut findings);
    check_edges(document, &mut findings);
    detect_cycles(document, &mut findings);
    check_orphans(document, &mut findings);

    for node in &document.nodes {
        check_required_config(node, catalog, &mut findings);
        if let Some(catalog) = catalog {
            if find_node_type(catalog, &node.type_id).is_none() {
                findings.push(Finding::UnknownType {
                    node_id: node.id.clone(),
                    type_id: node.type_id.clone(),
                });
            }
        }
    }

    findings
}

fn check_duplicate_nodes(document: &WorkflowDocument, findings: &mut Vec<Finding>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for node in &document.nodes {
        if !seen.insert(node.id.as_str()) && reported.insert(node.id.as_str()) {
            findings.push(Finding::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
    }
}

/// Check that edge endpoints exist, and flag self-loops and duplicates
fn check_edges(document: &WorkflowDocument, findings: &mut Vec<Finding>) {
    let node_ids: HashSet<&str> = document.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut port_pairs = HashSet::new();

    for edge in &document.edges {
        for endpoint in [&edge.source_node_id, &edge.target_node_id] {
            if !node_ids.contains(endpoint.as_str()) {
                findings.push(Finding::MissingNode {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
        if edge.source_node_id == edge.target_node_id {
            findings.push(Finding::SelfLoop {
                edge_id: edge.id.clone(),
                node_id: edge.source_node_id.clone(),
            });
        }
        let key = (
            edge.source_node_id.as_str(),
            edge.source_port.as_str(),
            edge.target_node_id.as_str(),
            edge.target_port.as_str(),
        );
        if !port_pairs.insert(key) {
            findings.push(Finding::DuplicateEdge {
                edge_id: edge.id.clone(),
            });
        }
    }
}

/// Detect cycles using Kahn's algorithm (topological sort)
///
/// Self-loops and edges with missing endpoints are reported by
/// `check_edges` and skipped here.
fn detect_cycles(document: &WorkflowDocument, findings: &mut Vec<Finding>) {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for node in &document.nodes {
        in_degree.insert(&node.id, 0);
    }
    let edges: Vec<(&str, &str)> = document
        .edges
        .iter()
        .filter(|e| e.source_node_id != e.target_node_id)
        .filter(|e| {
            in_degree.contains_key(e.source_node_id.as_str())
                && in_degree.contains_key(e.target_node_id.as_str())
        })
        .map(|e| (e.source_node_id.as_str(), e.target_node_id.as_str()))
        .collect();
    for (_, target) in &edges {
        if let Some(deg) = in_degree.get_mut(target) {
            *deg += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0;
    while let Some(node_id) = queue.pop_front() {
        visited += 1;
        for (source, target) in &edges {
            if *source == node_id {
                if let Some(deg) = in_degree.get_mut(target) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(*target);
                    }
                }
            }
        }
    }

    if visited < in_degree.len() {
        let mut remaining: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg > 0)
            .map(|(&id, _)| id)
            .collect();
        // Nodes downstream of a cycle are left over too; peel off the ones
        // that lead nowhere until only cycle members remain
        loop {
            let sinks: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    !edges
                        .iter()
                        .any(|(source, target)| source == id && remaining.contains(target))
                })
                .collect();
            if sinks.is_empty() {
                break;
            }
            for sink in sinks {
                remaining.remove(sink);
            }
        }
        findings.push(Finding::Cycle {
            node_ids: remaining.into_iter().map(str::to_string).collect(),
        });
    }
}

fn check_orphans(document: &WorkflowDocument, findings: &mut Vec<Finding>) {
    if document.nodes.len() < 2 {
        return;
    }
    for node in &document.nodes {
        if document.incident_edges(&node.id).next().is_none() {
            findings.push(Finding::OrphanedNode {
                node_id: node.id.clone(),
            });
        }
    }
}

/// Check that required config fields have a non-empty value
fn check_required_config(node: &GraphNode, catalog: Option<&Catalog>, findings: &mut Vec<Finding>) {
    let schema = match &node.display_data.config_schema {
        Some(schema) => schema,
        None => match catalog.and_then(|c| find_node_type(c, &node.type_id)) {
            Some(ty) => &ty.config_schema,
            None => return,
        },
    };
    for field in schema.required_fields() {
        let present = match node.display_data.config.get(&field.key) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            findings.push(Finding::MissingRequiredConfig {
                node_id: node.id.clone(),
                field: field.key.clone(),
            });
        }
    }
}

/// Decides when validation runs automatically
#[derive(Debug, Clone, Copy)]
pub struct ValidationAdvisor {
    auto_validate: bool,
}

impl ValidationAdvisor {
    pub fn new(auto_validate: bool) -> Self {
        Self { auto_validate }
    }

    pub fn auto_validate(&self) -> bool {
        self.auto_validate
    }

    pub fn set_auto_validate(&mut self, enabled: bool) {
        self.auto_validate = enabled;
    }

    /// Whether a change should trigger automatic validation
    pub fn should_run(&self, change: &GraphChange) -> bool {
        self.auto_validate && change.is_structural()
    }

    /// Validate on demand
    pub fn validate(&self, document: &WorkflowDocument, catalog: Option<&Catalog>) -> ValidationReport {
        validate_document(document, catalog)
    }
}

impl Default for ValidationAdvisor {
    fn default() -> Self {
        Self::new(true)
    }
}
