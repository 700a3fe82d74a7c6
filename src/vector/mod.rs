//! Vector utilities (C2): embedding format checks, collection dimension
//! audits, and vector-index lifecycle. Never raises for business
//! conditions — every operation returns a structured issue list or report
//! (spec §4.1 "Failure").

use crate::document::DocumentId;
use crate::embedding::Embedder;
use crate::error::StoreResult;
use crate::storage::vector_store::VectorStore;
use crate::storage::{DocumentFilter, Store};
use std::collections::HashSet;
use std::sync::Arc;

/// `check_embedding_format(v)`: ok iff `v` is non-empty and every component
/// is finite.
pub fn check_embedding_format(v: &[f32]) -> (bool, Option<String>) {
    if v.is_empty() {
        return (false, Some("embedding is empty".to_string()));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return (false, Some("embedding contains non-finite values".to_string()));
    }
    (true, None)
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DocumentStats {
    pub total: u64,
    pub with_embeddings: u64,
    pub missing: u64,
    pub dimensions_found: Vec<usize>,
    pub models_found: Vec<String>,
    pub issues: Vec<String>,
}

/// `document_stats(collection)` — audits embedding coverage and consistency.
pub async fn document_stats(store: &dyn Store, collection: &str) -> StoreResult<DocumentStats> {
    let filter = DocumentFilter {
        collections: vec![collection.to_string()],
        ..Default::default()
    };
    let docs = store.list_documents(&filter).await?;

    let mut stats = DocumentStats {
        total: docs.len() as u64,
        ..Default::default()
    };
    let mut dims: HashSet<usize> = HashSet::new();
    let mut models: HashSet<String> = HashSet::new();

    for doc in &docs {
        match (&doc.embedding, &doc.embedding_metadata) {
            (Some(e), Some(meta)) => {
                stats.with_embeddings += 1;
                dims.insert(e.len());
                models.insert(meta.model.clone());
                if e.len() != meta.dimensions {
                    stats
                        .issues
                        .push(format!("document {} embedding length {} != recorded dimension {}", doc.id, e.len(), meta.dimensions));
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                stats.issues.push(format!("document {} has inconsistent embedding metadata", doc.id));
            }
            (None, None) => stats.missing += 1,
        }
    }

    if stats.missing > 0 {
        stats.issues.push(format!("{} documents missing embeddings", stats.missing));
    }
    if dims.len() > 1 {
        stats.issues.push(format!("inconsistent embedding dimensions: {dims:?}"));
    }
    if models.len() > 1 {
        stats.issues.push(format!("inconsistent embedding models: {models:?}"));
    }

    stats.dimensions_found = dims.into_iter().collect();
    stats.models_found = models.into_iter().collect();
    Ok(stats)
}

/// `ensure_vector_index(collection, field, metric, n_lists)` — no-op if the
/// collection already has vectors indexed; otherwise detects the dimension
/// from a sampled document (falling back to `default_dimension`).
pub async fn ensure_vector_index(
    store: &dyn Store,
    vector_store: &dyn VectorStore,
    collection: &str,
    default_dimension: usize,
) -> StoreResult<usize> {
    if let Some(dim) = vector_store.dimensions(collection) {
        return Ok(dim);
    }

    let filter = DocumentFilter {
        collections: vec![collection.to_string()],
        ..Default::default()
    };
    let docs = store.list_documents(&filter).await?;
    let dimension = docs
        .iter()
        .find_map(|d| d.embedding.as_ref().map(|e| e.len()))
        .unwrap_or(default_dimension);

    for doc in docs {
        if let Some(embedding) = doc.embedding {
            vector_store.upsert(collection, &doc.id, embedding);
        }
    }

    tracing::info!(collection, dimension, "vector index created");
    Ok(dimension)
}

/// `fix_collection_embeddings(collection, …, dry_run)` — regenerates
/// missing/mismatched embeddings via the embedding service. When `dry_run`,
/// only reports what would change.
pub async fn fix_collection_embeddings(
    store: &dyn Store,
    embedder: &Arc<dyn Embedder>,
    collection: &str,
    dry_run: bool,
) -> StoreResult<Vec<DocumentId>> {
    let stats_filter = DocumentFilter {
        collections: vec![collection.to_string()],
        ..Default::default()
    };
    let docs = store.list_documents(&stats_filter).await?;
    let target_dim = docs
        .iter()
        .find_map(|d| d.embedding.as_ref().map(|e| e.len()));

    let mut fixed = Vec::new();
    for mut doc in docs {
        let needs_fix = match (&doc.embedding, target_dim) {
            (None, _) => true,
            (Some(e), Some(dim)) => e.len() != dim,
            (Some(e), None) => !check_embedding_format(e).0,
        };
        if !needs_fix {
            continue;
        }
        if dry_run {
            fixed.push(doc.id.clone());
            continue;
        }
        if let Ok(embedding) = embedder.embed(&doc.text).await {
            doc = doc.with_embedding(embedding, embedder.model_name());
            store.update_document(&doc).await?;
            fixed.push(doc.id.clone());
        } else {
            tracing::warn!(document = %doc.id, "embedding regeneration failed, leaving document unfixed");
        }
    }
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_finite_embeddings() {
        assert!(!check_embedding_format(&[]).0);
        assert!(!check_embedding_format(&[1.0, f32::NAN]).0);
        assert!(check_embedding_format(&[1.0, 2.0]).0);
    }
}
