use std::collections::HashMap;

/// Free-form metadata attached to each entry.
pub type Metadata = HashMap<String, serde_json::Value>;

/// One persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

/// A query hit, most similar first.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

impl Entry {
    /// Convenience accessor for string metadata fields.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

impl ScoredEntry {
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }
}
