//! End-to-end coverage of the fused hybrid search path: tag pre-filter,
//! BM25 + semantic fan-out, RRF fusion, and top_n truncation working
//! together against a real (in-memory) store rather than mocked signals.

mod common;

use common::{seed_document, test_context};
use plexus_hybrid::search::hybrid::{hybrid_search, HybridRequest};

#[tokio::test]
async fn fused_search_ranks_a_doubly_relevant_document_first() {
    let ctx = test_context(32);

    let strong = seed_document(
        &ctx,
        "documents",
        "Rust async runtimes schedule futures cooperatively on a thread pool.",
        &["rust", "async"],
        true,
    )
    .await;
    let lexical_only = seed_document(
        &ctx,
        "documents",
        "Rust async runtimes are a popular topic in systems programming talks.",
        &[],
        false,
    )
    .await;
    let unrelated =
        seed_document(&ctx, "documents", "Baking sourdough bread requires a long, cold ferment.", &[], true).await;

    let outcome = hybrid_search(
        &ctx,
        HybridRequest {
            query_text: "Rust async runtimes".to_string(),
            collection: "documents".to_string(),
            bm25_weight: 0.5,
            semantic_weight: 0.5,
            top_n: 10,
            ..Default::default()
        },
    )
    .await;

    assert!(outcome.error.is_none());
    assert!(!outcome.results.is_empty());
    assert_eq!(outcome.results[0].document_id, strong.id);

    let ids: Vec<_> = outcome.results.iter().map(|h| h.document_id.as_str().to_string()).collect();
    assert!(ids.contains(&lexical_only.id.as_str().to_string()));
    assert!(!ids.iter().all(|id| id == &unrelated.id.as_str().to_string()));
}

#[tokio::test]
async fn tag_prefilter_short_circuits_to_an_empty_result() {
    let ctx = test_context(16);
    seed_document(&ctx, "documents", "Some generic text about rust programming.", &["rust"], true).await;

    let outcome = hybrid_search(
        &ctx,
        HybridRequest {
            query_text: "rust".to_string(),
            collection: "documents".to_string(),
            tag_list: vec!["nonexistent-tag".to_string()],
            top_n: 10,
            ..Default::default()
        },
    )
    .await;

    assert!(outcome.error.is_none());
    assert!(outcome.results.is_empty());
}

#[tokio::test]
async fn top_n_bounds_the_fused_result_count() {
    let ctx = test_context(16);
    for i in 0..8 {
        seed_document(&ctx, "documents", &format!("document number {i} about graph databases"), &[], true).await;
    }

    let outcome = hybrid_search(
        &ctx,
        HybridRequest {
            query_text: "graph databases".to_string(),
            collection: "documents".to_string(),
            top_n: 3,
            ..Default::default()
        },
    )
    .await;

    assert!(outcome.results.len() <= 3);
}
