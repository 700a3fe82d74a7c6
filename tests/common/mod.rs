//! Shared helpers for the integration tests: an in-memory store pre-wired
//! with a vector index and mock embedder, plus small fixtures for the Q&A
//! pipeline.

use plexus_hybrid::document::Document;
use plexus_hybrid::embedding::{Embedder, MockEmbedder};
use plexus_hybrid::qa::generator::{Section, SectionRelationship};
use plexus_hybrid::search::hybrid::SearchContext;
use plexus_hybrid::storage::sqlite::SqliteStore;
use plexus_hybrid::storage::vector_store::{InMemoryVectorStore, VectorStore};
use std::sync::Arc;

/// A fresh in-process `SearchContext`: SQLite-in-memory store, brute-force
/// vector index, and the deterministic hash embedder.
pub fn test_context(dimensions: usize) -> SearchContext {
    SearchContext {
        store: Arc::new(SqliteStore::open_in_memory().expect("open in-memory store")),
        vector_store: Arc::new(InMemoryVectorStore::new()),
        embedder: Arc::new(MockEmbedder::new(dimensions)),
    }
}

/// Inserts a document and, if `ctx` has an embedder wired up, its vector.
pub async fn seed_document(
    ctx: &SearchContext,
    collection: &str,
    text: &str,
    tags: &[&str],
    with_embedding: bool,
) -> Document {
    let mut doc = Document::new(collection, "note", text).with_tags(tags.iter().copied());
    if with_embedding {
        let vector = ctx.embedder.embed(text).await.expect("mock embedder never fails on non-empty text");
        ctx.vector_store.upsert(collection, &doc.id, vector.clone());
        doc = doc.with_embedding(vector, ctx.embedder.model_name());
    }
    ctx.store.insert_document(&doc).await.expect("insert document");
    doc
}

/// A small fixed two-section corpus with one relationship between them, used
/// to exercise the Q&A generator end to end without a real LLM.
///
/// Titles are kept to a single character: the mock LLM echoes only the first
/// 80 characters of the prompt it's given, and the per-type prompt templates
/// put ~78 characters of fixed preamble before the section title, so a
/// longer title would get truncated out of the echoed answer and never
/// satisfy the grounding check.
pub fn sample_sections() -> Vec<Section> {
    vec![
        Section {
            id: "s1".to_string(),
            title: "A".to_string(),
            level: 1,
            text: "Plexus Hybrid combines lexical, semantic, tag, and graph search.".to_string(),
            content_hash: "hash-s1".to_string(),
        },
        Section {
            id: "s2".to_string(),
            title: "B".to_string(),
            level: 2,
            text: "Reciprocal rank fusion combines ranked lists from independent signals.".to_string(),
            content_hash: "hash-s2".to_string(),
        },
    ]
}

pub fn sample_relationships() -> Vec<SectionRelationship> {
    vec![SectionRelationship {
        from_id: "s1".to_string(),
        to_id: "s2".to_string(),
        relationship_type: "elaborates".to_string(),
        confidence: 0.9,
    }]
}
