//! Document representation (spec §3)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Unique identifier for a document, serialized as a plain string
/// (`"<collection>/<key>"`, matching the multi-model store's `_id` shape).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(collection: &str) -> Self {
        Self(format!("{}/{}", collection, Uuid::new_v4()))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The collection portion of `collection/key`, if the id is well-formed.
    pub fn collection(&self) -> Option<&str> {
        self.0.split('/').next()
    }

    /// The key portion of `collection/key`, if the id is well-formed.
    pub fn key(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, k)| k)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata about how a document's embedding was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
}

/// A document belonging to exactly one collection (spec §3 Invariant 3:
/// `embedding.len()` must equal the collection's recorded dimension whenever
/// `embedding` is `Some`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub key: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub text: String,
    #[serde(default)]
    pub tags: HashSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_metadata: Option<EmbeddingMetadata>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Document {
    pub fn new(collection: &str, doc_type: impl Into<String>, text: impl Into<String>) -> Self {
        let id = DocumentId::new(collection);
        let key = id.key().unwrap_or_default().to_string();
        Self {
            id,
            key,
            doc_type: doc_type.into(),
            text: text.into(),
            tags: HashSet::new(),
            embedding: None,
            embedding_metadata: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(|t| t.into()).collect();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>, model: impl Into<String>) -> Self {
        let dimensions = embedding.len();
        self.embedding_metadata = Some(EmbeddingMetadata {
            model: model.into(),
            dimensions,
            created_at: Utc::now(),
        });
        self.embedding = Some(embedding);
        self
    }

    /// ANY-match: at least one of `tags` is present on this document.
    pub fn matches_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }

    /// ALL-match: every one of `tags` is present on this document.
    pub fn matches_all_tags(&self, tags: &[String]) -> bool {
        tags.iter().all(|t| self.tags.contains(t))
    }

    /// `tag_match_score` per spec §4.5: `|intersect| / |requested|`.
    pub fn tag_match_score(&self, requested: &[String]) -> f32 {
        if requested.is_empty() {
            return 0.0;
        }
        let intersect = requested.iter().filter(|t| self.tags.contains(*t)).count();
        intersect as f32 / requested.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_round_trips_collection_and_key() {
        let id = DocumentId::new("documents");
        assert_eq!(id.collection(), Some("documents"));
        assert!(id.key().is_some());
    }

    #[test]
    fn tag_match_score_is_intersection_over_requested() {
        let doc = Document::new("documents", "note", "hello").with_tags(["python", "db"]);
        let score = doc.tag_match_score(&["python".to_string(), "rust".to_string()]);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn matches_all_requires_every_tag() {
        let doc = Document::new("documents", "note", "hello").with_tags(["python", "db"]);
        assert!(doc.matches_all_tags(&["python".to_string(), "db".to_string()]));
        assert!(!doc.matches_all_tags(&["python".to_string(), "rust".to_string()]));
    }
}
