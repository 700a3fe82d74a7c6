//! BM25 lexical searcher (C4, spec §4.3).

use super::{SearchHit, SearchOutcome};
use crate::storage::{DocumentFilter, Store, BM25_NO_LIMIT};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct Bm25Query {
    pub query_text: String,
    pub collections: Vec<String>,
    pub min_score: f32,
    pub top_n: usize,
    pub offset: usize,
    pub tag_list: Vec<String>,
}

/// `bm25_search` (spec §4.3): tokenize, score via the view's analyzer, apply
/// the `min_score` cutoff and `ALL`-semantics tag filter, paginate, and run
/// an auxiliary count query sharing the same filters.
pub async fn bm25_search(store: &dyn Store, query: &Bm25Query) -> SearchOutcome {
    let started = Instant::now();

    if query.query_text.trim().is_empty() {
        return SearchOutcome::failed("bm25-failed", "text", "Query text cannot be empty");
    }

    if !query.collections.is_empty() {
        for collection in &query.collections {
            match store.has_collection(collection).await {
                Ok(true) => {}
                Ok(false) => {
                    return SearchOutcome::failed(
                        "bm25-failed",
                        "text",
                        format!("collection does not exist: {collection}"),
                    )
                }
                Err(e) => return SearchOutcome::failed("bm25-failed", "text", e.to_string()),
            }
        }
    }

    // Fetch every matching row, not just enough to paginate from: spec §4.3
    // step 5 requires `total_count` to reflect an auxiliary, unpaginated
    // count query sharing these same filters, so the candidate set itself
    // has to be complete before we apply min_score/tag filtering and count
    // what survives.
    let candidates = match store.bm25_candidates(&query.query_text, &query.collections, BM25_NO_LIMIT).await {
        Ok(c) => c,
        Err(e) => return SearchOutcome::failed("bm25-failed", "text", e.to_string()),
    };

    let filter = DocumentFilter {
        collections: query.collections.clone(),
        tags: query.tag_list.clone(),
        require_all_tags: true,
        attribute_equals: vec![],
    };
    let tag_filtered_docs = match store.list_documents(&filter).await {
        Ok(docs) => docs,
        Err(e) => return SearchOutcome::failed("bm25-failed", "text", e.to_string()),
    };
    let allowed: std::collections::HashSet<String> =
        tag_filtered_docs.into_iter().map(|d| d.id.as_str().to_string()).collect();

    let mut scored: Vec<(String, f32)> = candidates
        .into_iter()
        .filter(|(id, score)| *score >= query.min_score && allowed.contains(id.as_str()))
        .map(|(id, score)| (id.as_str().to_string(), score))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let total_count = scored.len() as u64;
    let page: Vec<(String, f32)> = scored.into_iter().skip(query.offset).take(query.top_n).collect();

    let results = page
        .into_iter()
        .enumerate()
        .map(|(i, (id, score))| SearchHit {
            document_id: crate::document::DocumentId::from_string(id),
            score,
            similarity_score: None,
            tag_match_score: None,
            rank: i + 1,
        })
        .collect();

    let elapsed_ms = started.elapsed().as_millis() as u64;
    SearchOutcome::succeeded("bm25", "text", results, total_count, elapsed_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::storage::sqlite::SqliteStore;

    #[tokio::test]
    async fn empty_query_returns_structured_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let outcome = bm25_search(&store, &Bm25Query { query_text: "".into(), top_n: 10, ..Default::default() }).await;
        assert!(outcome.error.is_some());
        assert_eq!(outcome.search_engine, "bm25-failed");
    }

    #[tokio::test]
    async fn tag_filter_restricts_to_matching_documents() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = Document::new("documents", "note", "python database tutorial").with_tags(["python", "db"]);
        let b = Document::new("documents", "note", "python basics").with_tags(["python"]);
        let c = Document::new("documents", "note", "database basics").with_tags(["db"]);
        store.insert_document(&a).await.unwrap();
        store.insert_document(&b).await.unwrap();
        store.insert_document(&c).await.unwrap();

        let outcome = bm25_search(
            &store,
            &Bm25Query {
                query_text: "python".into(),
                tag_list: vec!["python".into(), "db".into()],
                top_n: 10,
                ..Default::default()
            },
        )
        .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].document_id, a.id);
    }
}
