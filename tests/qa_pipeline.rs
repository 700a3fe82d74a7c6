//! End-to-end coverage of the Q&A pipeline (C13 generate -> C14 reverse ->
//! C15 validate) wired together the way a real ingestion adapter would use
//! it, using the deterministic mock LLM instead of a network call.

mod common;

use common::{sample_relationships, sample_sections, test_context};
use plexus_hybrid::config::QAGenerationConfig;
use plexus_hybrid::document::{Document, DocumentId};
use plexus_hybrid::llm::{LlmClient, MockLlmClient};
use plexus_hybrid::qa::{generate_reversal_batch, QABatch, QaGenerator, QaValidator, QuestionType};
use std::collections::HashMap;
use std::sync::Arc;

fn fast_config(weights: HashMap<QuestionType, f32>) -> QAGenerationConfig {
    let mut config = QAGenerationConfig::default();
    config.question_type_weights = weights;
    config.max_retries = 0;
    config.retry_delay_ms = 0;
    config.semaphore_limit = 4;
    config.min_answer_length = 1;
    config
}

#[tokio::test]
async fn generate_batch_grounds_every_pair_in_a_real_section_title() {
    let mut weights = HashMap::new();
    weights.insert(QuestionType::Factual, 1.0);

    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::default());
    let generator = QaGenerator::new(llm, fast_config(weights));

    let pairs = generator.generate_batch("documents/doc-1", &sample_sections(), &sample_relationships(), 3).await;

    assert!(!pairs.is_empty());
    for pair in &pairs {
        assert_eq!(pair.question_type, QuestionType::Factual);
        assert!(pair.answer.contains('A'), "answer {:?} should ground in the section title", pair.answer);
    }
}

#[tokio::test]
async fn reversal_batch_never_reuses_an_existing_reversal_and_respects_the_ratio() {
    let mut weights = HashMap::new();
    weights.insert(QuestionType::Factual, 1.0);
    let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::default());
    let generator = QaGenerator::new(llm, fast_config(weights));

    let pairs = generator.generate_batch("documents/doc-1", &sample_sections(), &sample_relationships(), 5).await;
    assert!(!pairs.is_empty());

    let reversed = generate_reversal_batch(&pairs, 0.5);
    assert!(reversed.len() <= pairs.len());
    assert!(reversed.iter().all(|p| p.question_type == QuestionType::Reversal));
    assert!(reversed.iter().all(|p| p.reversal_of.is_some()));
}

#[tokio::test]
async fn validator_marks_a_batch_cited_against_the_store_backed_corpus() {
    // Exercises the full document-store -> corpus_blocks fallback ->
    // CorpusValidator -> QaValidator chain: the document carries no explicit
    // corpus_blocks rows, so the store must synthesize one from its own text
    // for the grounded pair below to validate.
    let ctx = test_context(8);
    let document = Document::new(
        "documents",
        "text",
        "Plexus Hybrid combines lexical, semantic, tag, and graph search across a knowledge base.",
    );
    ctx.store.insert_document(&document).await.unwrap();

    let grounded = sample_qa_pair(&document.text, QuestionType::Factual);
    let ungrounded = sample_qa_pair("Sourdough bread requires a long, cold fermentation.", QuestionType::Factual);

    let mut batch = QABatch::new(document.id.as_str(), vec![grounded, ungrounded]);
    let validator = QaValidator::new(0.7);
    validator
        .validate_batch(ctx.store.as_ref(), &DocumentId::from_string(document.id.as_str().to_string()), &mut batch)
        .await
        .unwrap();

    assert_eq!(batch.valid_pairs, 1);
    assert!(batch.qa_pairs[0].citation_found);
    assert!(!batch.qa_pairs[1].citation_found);
    assert!(batch.qa_pairs.iter().all(|p| p.satisfies_citation_invariant(0.7)));
}

fn sample_qa_pair(answer: &str, question_type: QuestionType) -> plexus_hybrid::qa::QAPair {
    plexus_hybrid::qa::QAPair {
        key: format!("qa-{answer}"),
        question: "What does this describe?".to_string(),
        thinking: String::new(),
        answer: answer.to_string(),
        question_type,
        difficulty: "easy".to_string(),
        confidence: 0.8,
        temperature_used: 0.3,
        source_section: "s1".to_string(),
        source_hash: "hash-s1".to_string(),
        evidence_blocks: vec![],
        relationship_types: vec![],
        related_entities: vec![],
        validation_score: None,
        citation_found: false,
        reversal_of: None,
    }
}
