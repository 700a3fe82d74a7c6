//! Bounded graph traverser (C7, spec §4.6).

use crate::document::DocumentId;
use crate::storage::{Direction, Store};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

const HARD_MAX_DEPTH: u32 = 3;
const DEFAULT_MAX_RELATED_PER_SEED: usize = 100;
const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct TraversalRequest {
    pub start_vertices: Vec<DocumentId>,
    pub min_depth: u32,
    pub max_depth: u32,
    pub direction: Direction,
    pub relationship_types: Option<Vec<String>>,
    pub max_related_per_seed: usize,
    pub traversal_timeout_ms: u64,
}

impl Default for TraversalRequest {
    fn default() -> Self {
        Self {
            start_vertices: vec![],
            min_depth: 0,
            max_depth: 3,
            direction: Direction::Outbound,
            relationship_types: None,
            max_related_per_seed: DEFAULT_MAX_RELATED_PER_SEED,
            traversal_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraversalHit {
    pub vertex: DocumentId,
    pub depth: u32,
    pub path: Vec<DocumentId>,
    /// Related vertices discovered via a lexical pre-query seed carry a
    /// scaled-down score (spec §4.6: "× 0.8").
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    pub hits: Vec<TraversalHit>,
    pub warnings: Vec<String>,
}

/// `graph_traverse`: breadth-first, `uniqueVertices=global`, per-seed fanout
/// capped, wall-clock capped. Depth is silently narrowed to `HARD_MAX_DEPTH`
/// with a warning (spec §4.6, scenario 6).
pub async fn graph_traverse(store: &dyn Store, request: &TraversalRequest) -> Result<TraversalOutcome, crate::error::StoreError> {
    let mut warnings = Vec::new();
    let mut max_depth = request.max_depth;
    if max_depth > HARD_MAX_DEPTH {
        warnings.push(format!(
            "max_depth {} exceeds the hard cap, narrowed to {}",
            max_depth, HARD_MAX_DEPTH
        ));
        max_depth = HARD_MAX_DEPTH;
    }

    let deadline = Instant::now() + Duration::from_millis(request.traversal_timeout_ms);
    let mut visited: HashSet<String> = HashSet::new();
    let mut hits = Vec::new();

    for seed in &request.start_vertices {
        visited.insert(seed.as_str().to_string());
        let mut queue: VecDeque<(DocumentId, u32, Vec<DocumentId>)> = VecDeque::new();
        queue.push_back((seed.clone(), 0, vec![seed.clone()]));
        let mut fanout_for_seed = 0usize;
        let mut timed_out = false;

        while let Some((vertex, depth, path)) = queue.pop_front() {
            if Instant::now() >= deadline {
                timed_out = true;
                break;
            }
            if depth >= max_depth {
                continue;
            }
            if fanout_for_seed >= request.max_related_per_seed {
                warnings.push(format!("per-seed fanout limit hit for {}", seed));
                break;
            }

            let edges = store
                .edges_touching(&vertex, request.direction, request.relationship_types.as_deref())
                .await?;

            for edge in edges {
                let next = if edge.from == vertex { edge.to.clone() } else { edge.from.clone() };
                if visited.contains(next.as_str()) {
                    continue;
                }
                visited.insert(next.as_str().to_string());
                fanout_for_seed += 1;

                let next_depth = depth + 1;
                let mut next_path = path.clone();
                next_path.push(next.clone());

                if next_depth >= request.min_depth {
                    hits.push(TraversalHit { vertex: next.clone(), depth: next_depth, path: next_path.clone(), score: 1.0 });
                }
                queue.push_back((next, next_depth, next_path));

                if fanout_for_seed >= request.max_related_per_seed {
                    break;
                }
            }
        }

        if timed_out {
            warnings.push("traversal timeout reached before exhausting the frontier".to_string());
        }
    }

    Ok(TraversalOutcome { hits, warnings })
}

/// `graph_rag_search`: seeds the traversal from a lexical pre-query instead
/// of an explicit `start_vertex`. Related vertices found this way carry a
/// scaled-down score (× 0.8) relative to direct hits.
pub async fn graph_rag_search(
    store: &dyn Store,
    seed_vertices: Vec<DocumentId>,
    mut request: TraversalRequest,
) -> Result<TraversalOutcome, crate::error::StoreError> {
    request.start_vertices = seed_vertices;
    let mut outcome = graph_traverse(store, &request).await?;
    for hit in outcome.hits.iter_mut() {
        hit.score *= 0.8;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::graph::edge::Edge;
    use crate::storage::sqlite::SqliteStore;
    use chrono::Utc;

    #[tokio::test]
    async fn depth_is_capped_at_three_with_a_warning() {
        let store = SqliteStore::open_in_memory().unwrap();
        let docs: Vec<Document> = (0..5).map(|i| Document::new("documents", "note", format!("n{i}"))).collect();
        for d in &docs {
            store.insert_document(d).await.unwrap();
        }
        for pair in docs.windows(2) {
            let e = Edge::new("relationships", pair[0].id.clone(), pair[1].id.clone(), "next", Utc::now());
            store.insert_edge(&e).await.unwrap();
        }

        let request = TraversalRequest { start_vertices: vec![docs[0].id.clone()], max_depth: 7, ..Default::default() };
        let outcome = graph_traverse(&store, &request).await.unwrap();
        assert!(outcome.warnings.iter().any(|w| w.contains("hard cap")));
        assert!(outcome.hits.iter().all(|h| h.depth <= 3));
    }
}
