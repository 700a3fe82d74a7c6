//! Temporal edge store (C10, spec §4.9).

use super::edge::{Edge, EdgeId};
use crate::document::DocumentId;
use crate::error::{GraphError, GraphResult};
use crate::storage::Store;
use chrono::{DateTime, Utc};

/// Creates an edge active from `valid_at` with `invalid_at = null`.
pub async fn create_edge(
    store: &dyn Store,
    collection: &str,
    from: DocumentId,
    to: DocumentId,
    edge_type: impl Into<String>,
    valid_at: DateTime<Utc>,
) -> GraphResult<Edge> {
    let edge = Edge::new(collection, from, to, edge_type, valid_at);
    store.insert_edge(&edge).await?;
    Ok(edge)
}

/// `invalidate_edge`: mutates only `invalid_at`/`invalidation_reason`/
/// `invalidated_by`; idempotent per `Edge::invalidate`.
pub async fn invalidate_edge(
    store: &dyn Store,
    edge_id: &EdgeId,
    invalid_at: DateTime<Utc>,
    reason: impl Into<String>,
    invalidated_by: Option<String>,
) -> GraphResult<Edge> {
    let mut edge = store
        .get_edge(edge_id)
        .await?
        .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
    edge.invalidate(invalid_at, reason, invalidated_by);
    store.update_edge(&edge).await?;
    Ok(edge)
}

/// `detect_contradicting_edges(from, to, type?, attribute_filter?, include_invalidated)`.
pub async fn detect_contradicting_edges(
    store: &dyn Store,
    from: &DocumentId,
    to: &DocumentId,
    edge_type: Option<&str>,
    attribute_filter: &[(String, serde_json::Value)],
    include_invalidated: bool,
) -> GraphResult<Vec<Edge>> {
    let candidates = store.edges_between(from, to, edge_type, include_invalidated).await?;
    Ok(candidates
        .into_iter()
        .filter(|e| attribute_filter.iter().all(|(k, v)| e.attributes.get(k) == Some(v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::SqliteStore;

    #[tokio::test]
    async fn invalidate_is_idempotent_through_the_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let edge = create_edge(
            &store,
            "relationships",
            DocumentId::from("documents/a"),
            DocumentId::from("documents/b"),
            "relates_to",
            Utc::now(),
        )
        .await
        .unwrap();

        let first = invalidate_edge(&store, &edge.id, Utc::now(), "first", None).await.unwrap();
        let second = invalidate_edge(&store, &edge.id, Utc::now(), "second", None).await.unwrap();
        assert_eq!(first.invalid_at, second.invalid_at);
    }
}
