//! Hybrid orchestrator (C9, spec §4.8).

use super::bm25::{bm25_search, Bm25Query};
use super::fusion::{normalize_weights, weighted_reciprocal_rank_fusion, WeightedList, DEFAULT_RRF_K};
use super::graph_traverse::{graph_rag_search, TraversalRequest};
use super::semantic::{semantic_search, SemanticQuery, SemanticSearchRequest};
use super::tag::{tag_search, TagMatchMode, TagQuery};
use super::{SearchHit, SearchOutcome};
use crate::embedding::Embedder;
use crate::storage::vector_store::VectorStore;
use crate::storage::{Direction, Store};
use std::sync::Arc;
use std::time::Instant;

/// The process-wide collaborators a hybrid request is run against. Grouped
/// so call sites don't thread four trait-object references through every
/// function signature.
pub struct SearchContext {
    pub store: Arc<dyn Store>,
    pub vector_store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Clone)]
pub struct HybridRequest {
    pub query_text: String,
    pub collection: String,
    pub bm25_weight: f32,
    pub semantic_weight: f32,
    pub graph_weight: f32,
    pub use_graph: bool,
    pub tag_list: Vec<String>,
    pub top_n: usize,
    pub min_score: f32,
}

impl Default for HybridRequest {
    fn default() -> Self {
        Self {
            query_text: String::new(),
            collection: "documents".to_string(),
            bm25_weight: 0.5,
            semantic_weight: 0.5,
            graph_weight: 0.0,
            use_graph: false,
            tag_list: vec![],
            top_n: 10,
            min_score: 0.0,
        }
    }
}

/// `hybrid_search` (spec §4.8): tag pre-filter, fan out BM25/semantic/graph
/// concurrently, fuse via RRF, dedupe, slice to `top_n`.
pub async fn hybrid_search(ctx: &SearchContext, request: HybridRequest) -> SearchOutcome {
    let started = Instant::now();
    let mut warnings = Vec::new();

    let mut weights = if request.use_graph {
        vec![request.bm25_weight, request.semantic_weight, request.graph_weight]
    } else {
        vec![request.bm25_weight, request.semantic_weight]
    };
    if normalize_weights(&mut weights) {
        warnings.push("fusion weights did not sum to 1.0 and were renormalized".to_string());
    }

    if !request.tag_list.is_empty() {
        let tag_outcome = tag_search(
            ctx.store.as_ref(),
            &TagQuery {
                collections: vec![request.collection.clone()],
                tags: request.tag_list.clone(),
                mode: TagMatchMode::All,
                attribute_equals: vec![],
                top_n: usize::MAX,
            },
        )
        .await;
        if tag_outcome.results.is_empty() {
            let mut outcome = SearchOutcome::succeeded("hybrid-tag-filtered", "hybrid", vec![], 0, started.elapsed().as_millis() as u64);
            outcome.warnings = warnings;
            return outcome;
        }
    }

    let bm25_query = Bm25Query {
        query_text: request.query_text.clone(),
        collections: vec![request.collection.clone()],
        min_score: 0.0,
        top_n: request.top_n * 3,
        offset: 0,
        tag_list: request.tag_list.clone(),
    };

    let use_graph = request.use_graph
        && matches!(ctx.store.has_collection("relationships").await, Ok(true));
    if request.use_graph && !use_graph {
        warnings.push("graph branch skipped: edge collection does not exist".to_string());
    }

    let (bm25_outcome, semantic_outcome, graph_hits) = if use_graph {
        let (bm25, semantic, graph) = tokio::join!(
            bm25_search(ctx.store.as_ref(), &bm25_query),
            semantic_search(
                ctx.store.as_ref(),
                ctx.vector_store.as_ref(),
                &ctx.embedder,
                &request.collection,
                SemanticSearchRequest {
                    query: SemanticQuery::Text(request.query_text.clone()),
                    collections: vec![request.collection.clone()],
                    top_n: request.top_n * 3,
                    tag_list: request.tag_list.clone(),
                    ..Default::default()
                },
            ),
            graph_seed_and_traverse(ctx, &request),
        );
        (bm25, semantic, graph)
    } else {
        let (bm25, semantic) = tokio::join!(
            bm25_search(ctx.store.as_ref(), &bm25_query),
            semantic_search(
                ctx.store.as_ref(),
                ctx.vector_store.as_ref(),
                &ctx.embedder,
                &request.collection,
                SemanticSearchRequest {
                    query: SemanticQuery::Text(request.query_text.clone()),
                    collections: vec![request.collection.clone()],
                    top_n: request.top_n * 3,
                    tag_list: request.tag_list.clone(),
                    ..Default::default()
                },
            ),
        );
        (bm25, semantic, Vec::new())
    };

    let engine = if use_graph { "hybrid-bm25-semantic-graph" } else { "hybrid-bm25-semantic" };

    if let Some(err) = &bm25_outcome.error {
        warnings.push(format!("bm25 branch failed: {err}"));
    }
    if let Some(err) = &semantic_outcome.error {
        warnings.push(format!("semantic branch failed: {err}"));
    }

    let mut lists: Vec<WeightedList> = vec![
        WeightedList { hits: &bm25_outcome.results, weight: weights[0] },
        WeightedList { hits: &semantic_outcome.results, weight: weights[1] },
    ];
    if use_graph {
        lists.push(WeightedList { hits: &graph_hits, weight: weights[2] });
    }

    let fused = weighted_reciprocal_rank_fusion(&lists, DEFAULT_RRF_K);
    let mut deduped: Vec<SearchHit> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for hit in fused {
        if seen.insert(hit.document_id.as_str().to_string()) {
            deduped.push(hit);
        }
        if deduped.len() >= request.top_n {
            break;
        }
    }

    let mut outcome = SearchOutcome::succeeded(engine, "hybrid", deduped, 0, started.elapsed().as_millis() as u64);
    outcome.warnings = warnings;
    outcome
}

async fn graph_seed_and_traverse(ctx: &SearchContext, request: &HybridRequest) -> Vec<SearchHit> {
    let seed_outcome = bm25_search(
        ctx.store.as_ref(),
        &Bm25Query {
            query_text: request.query_text.clone(),
            collections: vec![request.collection.clone()],
            min_score: 0.0,
            top_n: 10,
            offset: 0,
            tag_list: vec![],
        },
    )
    .await;

    let seeds: Vec<_> = seed_outcome.results.into_iter().map(|h| h.document_id).collect();
    if seeds.is_empty() {
        return Vec::new();
    }

    let traversal = graph_rag_search(
        ctx.store.as_ref(),
        seeds,
        TraversalRequest { direction: Direction::Any, ..Default::default() },
    )
    .await;

    match traversal {
        Ok(outcome) => outcome
            .hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| SearchHit {
                document_id: hit.vertex,
                score: hit.score,
                similarity_score: None,
                tag_match_score: None,
                rank: i + 1,
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}
