//! Contradiction engine (C11, spec §4.9).

use super::edge::Edge;
use super::temporal_store::detect_contradicting_edges;
use crate::error::GraphResult;
use crate::storage::Store;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStrategy {
    NewestWins,
    Merge,
    SplitTimeline,
}

/// Resolution outcome — always a value, never an `Err` (spec §7:
/// "Contradiction: non-fatal; resolutions carry `success` booleans").
#[derive(Debug, Clone)]
pub struct ResolutionOutcome {
    pub action: String,
    pub success: bool,
    pub reason: String,
}

/// `detect_temporal_contradictions`: among edges sharing `(from, to, type)`,
/// keep those whose `[valid_at, invalid_at)` interval overlaps the new
/// edge's.
pub async fn detect_temporal_contradictions(
    store: &dyn Store,
    new_edge: &Edge,
    exclude_keys: &[String],
) -> GraphResult<Vec<Edge>> {
    let candidates =
        detect_contradicting_edges(store, &new_edge.from, &new_edge.to, Some(&new_edge.edge_type), &[], false).await?;
    Ok(candidates
        .into_iter()
        .filter(|e| !exclude_keys.contains(&e.key))
        .filter(|e| e.key != new_edge.key)
        .filter(|e| new_edge.overlaps(e))
        .collect())
}

/// `resolve_contradiction(new_edge, existing, strategy)`.
pub async fn resolve_contradiction(
    store: &dyn Store,
    new_edge: &mut Edge,
    existing: &mut Edge,
    strategy: ResolutionStrategy,
) -> GraphResult<ResolutionOutcome> {
    match strategy {
        ResolutionStrategy::NewestWins => resolve_newest_wins(store, new_edge, existing).await,
        ResolutionStrategy::Merge => resolve_merge(store, new_edge, existing).await,
        ResolutionStrategy::SplitTimeline => resolve_split_timeline(store, new_edge, existing).await,
    }
}

async fn resolve_newest_wins(store: &dyn Store, new_edge: &mut Edge, existing: &mut Edge) -> GraphResult<ResolutionOutcome> {
    if new_edge.created_at >= existing.created_at {
        existing.invalidate(new_edge.valid_at, "Superseded by newer edge", Some(new_edge.key.clone()));
        store.update_edge(existing).await?;
        store.insert_edge(new_edge).await?;
        Ok(ResolutionOutcome { action: "newest_wins".to_string(), success: true, reason: "new edge is newer; old edge invalidated".to_string() })
    } else {
        Ok(ResolutionOutcome {
            action: "newest_wins".to_string(),
            success: true,
            reason: "existing edge is newer; new edge discarded".to_string(),
        })
    }
}

async fn resolve_merge(store: &dyn Store, new_edge: &mut Edge, existing: &mut Edge) -> GraphResult<ResolutionOutcome> {
    let valid_at = new_edge.valid_at.min(existing.valid_at);
    let invalid_at = match (new_edge.invalid_at, existing.invalid_at) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    };

    // Accumulate provenance rather than overwrite it: `resolve_all_contradictions`
    // calls this once per detected contradiction and reassigns `new_edge` to the
    // merged result each time, so a 3+ edge merge chain must keep every earlier
    // `merged_from` entry, not just the two most recent keys.
    let mut merged_from = new_edge.merged_from.clone();
    if merged_from.is_empty() {
        merged_from.push(new_edge.key.clone());
    }
    merged_from.push(existing.key.clone());

    let mut merged = new_edge.clone();
    merged.valid_at = valid_at;
    merged.invalid_at = invalid_at;
    merged.merged_from = merged_from;

    existing.invalidate(valid_at, "Merged into a new edge", Some(merged.key.clone()));
    store.update_edge(existing).await?;
    store.insert_edge(&merged).await?;
    *new_edge = merged;

    Ok(ResolutionOutcome { action: "merge".to_string(), success: true, reason: "intervals merged".to_string() })
}

async fn resolve_split_timeline(store: &dyn Store, new_edge: &mut Edge, existing: &mut Edge) -> GraphResult<ResolutionOutcome> {
    use std::cmp::Ordering;
    match new_edge.valid_at.cmp(&existing.valid_at) {
        Ordering::Less => {
            new_edge.invalid_at = Some(existing.valid_at);
            store.insert_edge(new_edge).await?;
            Ok(ResolutionOutcome { action: "split_timeline".to_string(), success: true, reason: "new edge capped before existing".to_string() })
        }
        Ordering::Greater => {
            existing.invalidate(new_edge.valid_at, "Split by a later edge", Some(new_edge.key.clone()));
            store.update_edge(existing).await?;
            store.insert_edge(new_edge).await?;
            Ok(ResolutionOutcome { action: "split_timeline".to_string(), success: true, reason: "existing edge capped before new".to_string() })
        }
        Ordering::Equal => resolve_newest_wins(store, new_edge, existing).await,
    }
}

/// `resolve_all_contradictions`: detects, then resolves each contradiction
/// in sequence (insertion order), accumulating outcomes.
pub async fn resolve_all_contradictions(
    store: &dyn Store,
    new_edge: &mut Edge,
    strategy: ResolutionStrategy,
    exclude_keys: &[String],
) -> GraphResult<(Vec<ResolutionOutcome>, bool)> {
    let contradictions = detect_temporal_contradictions(store, new_edge, exclude_keys).await?;
    if contradictions.is_empty() {
        store.insert_edge(new_edge).await?;
        return Ok((Vec::new(), true));
    }

    let mut outcomes = Vec::new();
    let mut overall_success = true;
    for mut existing in contradictions {
        match resolve_contradiction(store, new_edge, &mut existing, strategy).await {
            Ok(outcome) => {
                overall_success &= outcome.success;
                outcomes.push(outcome);
            }
            Err(e) => {
                overall_success = false;
                outcomes.push(ResolutionOutcome { action: "error".to_string(), success: false, reason: e.to_string() });
            }
        }
    }
    Ok((outcomes, overall_success))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use crate::storage::sqlite::SqliteStore;
    use chrono::TimeZone;

    fn t(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn scenario_newest_wins_invalidates_the_older_edge() {
        let store = SqliteStore::open_in_memory().unwrap();
        let x = DocumentId::from("documents/x");
        let y = DocumentId::from("documents/y");

        let mut e1 = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 1, 1));
        e1.created_at = t(2020, 1, 1);
        store.insert_edge(&e1).await.unwrap();

        let mut e2 = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 6, 1));
        e2.created_at = t(2020, 6, 2);

        let (outcomes, success) =
            resolve_all_contradictions(&store, &mut e2, ResolutionStrategy::NewestWins, &[]).await.unwrap();
        assert!(success);
        assert_eq!(outcomes.len(), 1);

        let reloaded_e1 = store.get_edge(&e1.id).await.unwrap().unwrap();
        assert_eq!(reloaded_e1.invalid_at, Some(t(2020, 6, 1)));
        assert_eq!(reloaded_e1.invalidated_by, Some(e2.key.clone()));
    }

    #[tokio::test]
    async fn scenario_merge_widens_the_interval() {
        let store = SqliteStore::open_in_memory().unwrap();
        let x = DocumentId::from("documents/x");
        let y = DocumentId::from("documents/y");

        let mut e1 = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 1, 1));
        e1.invalid_at = Some(t(2020, 3, 1));
        store.insert_edge(&e1).await.unwrap();

        let mut e2 = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 2, 1));
        e2.invalid_at = Some(t(2020, 4, 1));

        resolve_all_contradictions(&store, &mut e2, ResolutionStrategy::Merge, &[]).await.unwrap();
        assert_eq!(e2.valid_at, t(2020, 1, 1));
        assert_eq!(e2.invalid_at, Some(t(2020, 4, 1)));
        assert_eq!(e2.merged_from.len(), 2);
    }

    #[tokio::test]
    async fn merging_three_overlapping_edges_keeps_every_key_in_merged_from() {
        let store = SqliteStore::open_in_memory().unwrap();
        let x = DocumentId::from("documents/x");
        let y = DocumentId::from("documents/y");

        // Three existing, non-overlapping-with-each-other edges that each
        // overlap the new edge's wide-open interval, so all three are
        // detected as contradictions in a single sweep and resolved one
        // after another against the same `new_edge`.
        let mut a = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 1, 1));
        a.invalid_at = Some(t(2020, 2, 1));
        let a_key = a.key.clone();
        store.insert_edge(&a).await.unwrap();

        let mut b = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 2, 1));
        b.invalid_at = Some(t(2020, 3, 1));
        let b_key = b.key.clone();
        store.insert_edge(&b).await.unwrap();

        let mut c = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 3, 1));
        c.invalid_at = Some(t(2020, 4, 1));
        let c_key = c.key.clone();
        store.insert_edge(&c).await.unwrap();

        let mut new_edge = Edge::new("relationships", x.clone(), y.clone(), "R", t(2020, 1, 15));
        new_edge.invalid_at = None;
        let new_key = new_edge.key.clone();

        let (outcomes, success) =
            resolve_all_contradictions(&store, &mut new_edge, ResolutionStrategy::Merge, &[]).await.unwrap();
        assert!(success);
        assert_eq!(outcomes.len(), 3);

        assert_eq!(new_edge.merged_from.len(), 4);
        assert!(new_edge.merged_from.contains(&new_key));
        assert!(new_edge.merged_from.contains(&a_key));
        assert!(new_edge.merged_from.contains(&b_key));
        assert!(new_edge.merged_from.contains(&c_key));
    }
}
