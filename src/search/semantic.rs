//! Semantic (vector) searcher (C5, spec §4.4).

use super::{CollectionStatus, SearchHit, SearchOutcome};
use crate::embedding::Embedder;
use crate::storage::vector_store::VectorStore;
use crate::storage::{DocumentFilter, Store};
use crate::vector;
use std::time::Instant;

/// Query embedding may already be precomputed, or derived from text via C1.
pub enum SemanticQuery {
    Text(String),
    Vector(Vec<f32>),
}

pub struct SemanticSearchRequest {
    pub query: SemanticQuery,
    pub collections: Vec<String>,
    pub min_score: f32,
    pub top_n: usize,
    pub tag_list: Vec<String>,
    pub validate_before_search: bool,
    pub auto_fix_embeddings: bool,
}

impl Default for SemanticSearchRequest {
    fn default() -> Self {
        Self {
            query: SemanticQuery::Text(String::new()),
            collections: vec![],
            min_score: 0.7,
            top_n: 10,
            tag_list: vec![],
            validate_before_search: true,
            auto_fix_embeddings: false,
        }
    }
}

/// `check_collection_readiness` (spec §4.4): ready iff the collection exists,
/// is non-empty, has >= 2 embedded documents sharing one dimension, and a
/// vector index exists.
pub async fn check_collection_readiness(
    store: &dyn Store,
    vector_store: &dyn VectorStore,
    collection: &str,
) -> Result<CollectionStatus, crate::error::StoreError> {
    let exists = store.has_collection(collection).await?;
    if !exists {
        return Ok(CollectionStatus {
            exists: false,
            document_count: 0,
            documents_with_embeddings: 0,
            dimensions_consistent: false,
            has_vector_index: false,
            reason: "collection does not exist".to_string(),
        });
    }

    let stats = vector::document_stats(store, collection).await?;
    if stats.total == 0 {
        return Ok(CollectionStatus {
            exists: true,
            document_count: 0,
            documents_with_embeddings: 0,
            dimensions_consistent: false,
            has_vector_index: vector_store.dimensions(collection).is_some(),
            reason: "empty collection".to_string(),
        });
    }
    if stats.with_embeddings < 2 {
        return Ok(CollectionStatus {
            exists: true,
            document_count: stats.total,
            documents_with_embeddings: stats.with_embeddings,
            dimensions_consistent: stats.dimensions_found.len() <= 1,
            has_vector_index: vector_store.dimensions(collection).is_some(),
            reason: "not enough documents with embeddings".to_string(),
        });
    }
    if stats.dimensions_found.len() > 1 {
        return Ok(CollectionStatus {
            exists: true,
            document_count: stats.total,
            documents_with_embeddings: stats.with_embeddings,
            dimensions_consistent: false,
            has_vector_index: vector_store.dimensions(collection).is_some(),
            reason: "inconsistent embedding dimensions".to_string(),
        });
    }
    if vector_store.dimensions(collection).is_none() {
        return Ok(CollectionStatus {
            exists: true,
            document_count: stats.total,
            documents_with_embeddings: stats.with_embeddings,
            dimensions_consistent: true,
            has_vector_index: false,
            reason: "no vector index".to_string(),
        });
    }

    Ok(CollectionStatus {
        exists: true,
        document_count: stats.total,
        documents_with_embeddings: stats.with_embeddings,
        dimensions_consistent: true,
        has_vector_index: true,
        reason: "ready".to_string(),
    })
}

fn is_fixable(reason: &str) -> bool {
    matches!(reason, "inconsistent embedding dimensions" | "no vector index")
}

/// `semantic_search` (spec §4.4): embed the query if needed, validate its
/// format, run ANN with a `k_inflate` over-fetch, then filter in-process by
/// `min_score` and `tag_list` until `top_n` accumulated.
pub async fn semantic_search(
    store: &dyn Store,
    vector_store: &dyn VectorStore,
    embedder: &std::sync::Arc<dyn Embedder>,
    collection: &str,
    request: SemanticSearchRequest,
) -> SearchOutcome {
    let started = Instant::now();

    let mut status = if request.validate_before_search {
        match check_collection_readiness(store, vector_store, collection).await {
            Ok(s) => s,
            Err(e) => return SearchOutcome::failed("semantic-failed", "vector", e.to_string()),
        }
    } else {
        // Caller opted out of the readiness gate: assume the collection is
        // ready and skip straight to embedding/ANN, same as the original's
        // `if validate_before_search:` guard.
        CollectionStatus {
            exists: true,
            document_count: 0,
            documents_with_embeddings: 0,
            dimensions_consistent: true,
            has_vector_index: true,
            reason: "ready".to_string(),
        }
    };

    if status.reason != "ready" && is_fixable(&status.reason) && request.auto_fix_embeddings {
        if status.reason == "inconsistent embedding dimensions" {
            let _ = crate::vector::fix_collection_embeddings(store, embedder, collection, false).await;
        }
        if !status.has_vector_index {
            let default_dim = embedder.dimensions();
            let _ = crate::vector::ensure_vector_index(store, vector_store, collection, default_dim).await;
        }
        status = match check_collection_readiness(store, vector_store, collection).await {
            Ok(s) => s,
            Err(e) => return SearchOutcome::failed("semantic-failed", "vector", e.to_string()),
        };
    }

    if status.reason != "ready" {
        let mut outcome = SearchOutcome::failed("semantic-failed", "vector", status.reason.clone());
        outcome.collection_status = Some(status);
        return outcome;
    }

    let query_vector = match request.query {
        SemanticQuery::Vector(v) => v,
        SemanticQuery::Text(text) => {
            if text.trim().is_empty() {
                return SearchOutcome::failed("semantic-failed", "vector", "Query text cannot be empty");
            }
            match embedder.embed(&text).await {
                Ok(v) => v,
                Err(e) => return SearchOutcome::failed("semantic-failed", "vector", e.to_string()),
            }
        }
    };

    let (ok, reason) = crate::vector::check_embedding_format(&query_vector);
    if !ok {
        return SearchOutcome::failed(
            "semantic-failed",
            "vector",
            format!("invalid query embedding: {}", reason.unwrap_or_default()),
        );
    }

    let k_inflate = if request.tag_list.is_empty() { 2 } else { 5 };
    let fetch_k = request.top_n * k_inflate;
    let neighbors = vector_store.knn(collection, &query_vector, fetch_k);

    let allowed_by_tag: Option<std::collections::HashSet<String>> = if request.tag_list.is_empty() {
        None
    } else {
        let filter = DocumentFilter {
            collections: vec![collection.to_string()],
            tags: request.tag_list.clone(),
            require_all_tags: false,
            attribute_equals: vec![],
        };
        match store.list_documents(&filter).await {
            Ok(docs) => Some(docs.into_iter().map(|d| d.id.as_str().to_string()).collect()),
            Err(e) => return SearchOutcome::failed("semantic-failed", "vector", e.to_string()),
        }
    };

    let mut results = Vec::new();
    for (id, similarity) in neighbors {
        if similarity < request.min_score {
            continue;
        }
        if let Some(allowed) = &allowed_by_tag {
            if !allowed.contains(id.as_str()) {
                continue;
            }
        }
        results.push(SearchHit {
            document_id: id,
            score: similarity,
            similarity_score: Some(similarity),
            tag_match_score: None,
            rank: results.len() + 1,
        });
        if results.len() >= request.top_n {
            break;
        }
    }

    let total_count = results.len() as u64;
    SearchOutcome::succeeded("semantic", "vector", results, total_count, started.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedder;
    use crate::storage::sqlite::SqliteStore;
    use crate::storage::vector_store::InMemoryVectorStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn empty_collection_is_a_fatal_readiness_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        let vectors = InMemoryVectorStore::new();
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::new(8));
        store.create_collection("empty", false).await.unwrap();

        let outcome = semantic_search(
            &store,
            &vectors,
            &embedder,
            "empty",
            SemanticSearchRequest { query: SemanticQuery::Text("anything".into()), ..Default::default() },
        )
        .await;

        assert_eq!(outcome.search_engine, "semantic-failed");
        assert!(outcome.error.unwrap().contains("empty"));
    }

    #[tokio::test]
    async fn validate_before_search_false_skips_the_readiness_gate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let vectors = InMemoryVectorStore::new();
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::new(8));
        store.create_collection("empty", false).await.unwrap();

        let outcome = semantic_search(
            &store,
            &vectors,
            &embedder,
            "empty",
            SemanticSearchRequest {
                query: SemanticQuery::Text("anything".into()),
                validate_before_search: false,
                ..Default::default()
            },
        )
        .await;

        assert_ne!(outcome.search_engine, "semantic-failed");
        assert!(outcome.error.is_none());
        assert!(outcome.results.is_empty());
    }
}
