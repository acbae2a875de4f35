//! Historical node-type strings
//!
//! Documents authored before type ids became canonical store loose type
//! strings such as "llm" or "api_call". The table maps those strings to the
//! display name of the node type they mean, which enrichment then looks up
//! in the catalogue.

use std::collections::HashMap;

/// Built-in mappings, keyed by lowercase legacy type string
const BUILTIN_ENTRIES: &[(&str, &str)] = &[
    ("manual", "Manual Trigger"),
    ("trigger", "Manual Trigger"),
    ("start", "Manual Trigger"),
    ("webhook", "Webhook Trigger"),
    ("webhook_node", "Webhook Trigger"),
    ("http", "HTTP Request"),
    ("http_node", "HTTP Request"),
    ("http_request_node", "HTTP Request"),
    ("api_call", "HTTP Request"),
    ("llm", "LLM Prompt"),
    ("llm_node", "LLM Prompt"),
    ("openai_chat", "LLM Prompt"),
    ("chat_completion", "LLM Prompt"),
    ("text_processor", "Text Transform"),
    ("transform", "Text Transform"),
    ("condition_node", "Condition"),
    ("if_else", "Condition"),
    ("branch", "Condition"),
    ("doc_loader", "Document Loader"),
    ("pdf_loader", "Document Loader"),
    ("file_loader", "Document Loader"),
    ("output_node", "Output"),
    ("result", "Output"),
    ("end", "Output"),
];

/// Lookup table from legacy type strings to expected display names
#[derive(Debug, Clone)]
pub struct LegacyTypeTable {
    entries: HashMap<String, String>,
}

impl LegacyTypeTable {
    /// A table with no mappings
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The table of known historical type strings
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (legacy, display_name) in BUILTIN_ENTRIES {
            table.insert(*legacy, *display_name);
        }
        table
    }

    /// Add or replace a mapping
    pub fn insert(&mut self, legacy_type: impl AsRef<str>, display_name: impl Into<String>) {
        self.entries
            .insert(normalize(legacy_type.as_ref()), display_name.into());
    }

    /// Display name expected for a legacy type string
    ///
    /// Matching ignores case and surrounding whitespace, and treats '-' and
    /// ' ' like '_'.
    pub fn display_name_for(&self, type_id: &str) -> Option<&str> {
        self.entries.get(&normalize(type_id)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LegacyTypeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(type_id: &str) -> String {
    type_id
        .trim()
        .to_lowercase()
        .replace(['-', ' '], "_")
}
