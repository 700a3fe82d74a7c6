//! Tag searcher (C6, spec §4.5).

use super::{SearchHit, SearchOutcome};
use crate::storage::{DocumentFilter, Store};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatchMode {
    Any,
    All,
}

#[derive(Debug, Clone)]
pub struct TagQuery {
    pub collections: Vec<String>,
    pub tags: Vec<String>,
    pub mode: TagMatchMode,
    pub attribute_equals: Vec<(String, serde_json::Value)>,
    pub top_n: usize,
}

/// `tag_search`: filters `doc.tags` by ANY/ALL semantics plus an optional
/// extra predicate, sorts by document key for determinism, and attaches
/// `tag_match_score = |intersect| / |requested|` to each hit.
pub async fn tag_search(store: &dyn Store, query: &TagQuery) -> SearchOutcome {
    let started = Instant::now();

    if query.tags.is_empty() {
        return SearchOutcome::failed("tag-failed", "tag", "at least one tag must be provided");
    }

    let filter = DocumentFilter {
        collections: query.collections.clone(),
        tags: query.tags.clone(),
        require_all_tags: query.mode == TagMatchMode::All,
        attribute_equals: query.attribute_equals.clone(),
    };

    let mut docs = match store.list_documents(&filter).await {
        Ok(docs) => docs,
        Err(e) => return SearchOutcome::failed("tag-failed", "tag", e.to_string()),
    };
    docs.sort_by(|a, b| a.key.cmp(&b.key));

    let total_count = docs.len() as u64;
    let results = docs
        .into_iter()
        .take(query.top_n.max(1))
        .enumerate()
        .map(|(i, doc)| SearchHit {
            tag_match_score: Some(doc.tag_match_score(&query.tags)),
            document_id: doc.id,
            score: doc.tag_match_score(&query.tags),
            similarity_score: None,
            rank: i + 1,
        })
        .collect();

    SearchOutcome::succeeded("tag", "tag", results, total_count, started.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::storage::sqlite::SqliteStore;

    #[tokio::test]
    async fn any_mode_matches_partial_overlap() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = Document::new("documents", "note", "a").with_tags(["python"]);
        store.insert_document(&a).await.unwrap();

        let outcome = tag_search(
            &store,
            &TagQuery {
                collections: vec!["documents".into()],
                tags: vec!["python".into(), "rust".into()],
                mode: TagMatchMode::Any,
                attribute_equals: vec![],
                top_n: 10,
            },
        )
        .await;
        assert_eq!(outcome.results.len(), 1);
    }
}
