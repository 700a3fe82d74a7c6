//! The hybrid retrieval engine (C4-C9).
//!
//! Every public search entry point returns a [`SearchOutcome`] rather than a
//! `Result` — business-level failures are values, not propagated errors
//! (spec §7). Only infrastructure failures (a broken store connection)
//! propagate via `StoreResult`.

pub mod bm25;
pub mod fusion;
pub mod graph_traverse;
pub mod hybrid;
pub mod semantic;
pub mod tag;

use crate::document::DocumentId;
use serde::Serialize;

/// One scored hit, shared by all signal searchers and the fused output.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document_id: DocumentId,
    pub score: f32,
    /// Set for semantic search results (spec §4.4): raw cosine similarity in
    /// `[-1, 1]`, which `score` mirrors for fusion purposes.
    pub similarity_score: Option<f32>,
    /// Set for tag search results (spec §4.5).
    pub tag_match_score: Option<f32>,
    /// 1-based rank within this signal's own result list, used by RRF (C8).
    pub rank: usize,
}

/// The spec §7 response envelope every search operation returns.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchHit>,
    pub search_engine: String,
    pub search_type: String,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub collection_status: Option<CollectionStatus>,
    pub total_count: Option<u64>,
    pub elapsed_ms: u64,
}

impl SearchOutcome {
    pub fn failed(search_engine: impl Into<String>, search_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            search_engine: search_engine.into(),
            search_type: search_type.into(),
            error: Some(error.into()),
            warnings: Vec::new(),
            collection_status: None,
            total_count: None,
            elapsed_ms: 0,
        }
    }

    pub fn succeeded(
        search_engine: impl Into<String>,
        search_type: impl Into<String>,
        results: Vec<SearchHit>,
        total_count: u64,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            results,
            search_engine: search_engine.into(),
            search_type: search_type.into(),
            error: None,
            warnings: Vec::new(),
            collection_status: None,
            total_count: Some(total_count),
            elapsed_ms,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Diagnostic tree attached to `ReadinessFailure` outcomes (spec §4.4/§7).
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub exists: bool,
    pub document_count: u64,
    pub documents_with_embeddings: u64,
    pub dimensions_consistent: bool,
    pub has_vector_index: bool,
    pub reason: String,
}
