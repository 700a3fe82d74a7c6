//! Q&A validator (C15, spec §4.13) — re-runs every generated pair's answer
//! through the same corpus-grounding contract as C3, and stamps the result
//! back onto the pair.

use super::types::{QABatch, QAPair};
use crate::corpus::CorpusValidator;
use crate::document::DocumentId;
use crate::error::StoreResult;
use crate::storage::Store;

pub struct QaValidator {
    corpus: CorpusValidator,
    threshold: f32,
}

impl QaValidator {
    pub fn new(threshold: f32) -> Self {
        Self { corpus: CorpusValidator::new(threshold), threshold }
    }

    /// Validates every pair in `batch` against `document_id`'s corpus,
    /// mutating `citation_found`/`validation_score` in place and
    /// recomputing `valid_pairs`.
    pub async fn validate_batch(&self, store: &dyn Store, document_id: &DocumentId, batch: &mut QABatch) -> StoreResult<()> {
        for pair in &mut batch.qa_pairs {
            self.validate_one(store, document_id, pair).await?;
        }
        batch.valid_pairs = batch.qa_pairs.iter().filter(|p| p.citation_found).count();
        Ok(())
    }

    /// Validates a single pair and returns whether it passed — used by C13's
    /// retry loop to decide whether a freshly generated pair needs another
    /// attempt.
    pub async fn validate_one(&self, store: &dyn Store, document_id: &DocumentId, pair: &mut QAPair) -> StoreResult<bool> {
        let result = self.corpus.validate(store, &pair.answer, document_id).await?;
        pair.validation_score = Some(result.score);
        pair.citation_found = result.valid;
        debug_assert!(pair.satisfies_citation_invariant(self.threshold));
        Ok(result.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::qa::types::QuestionType;
    use crate::storage::sqlite::SqliteStore;

    fn pair(answer: &str) -> QAPair {
        QAPair {
            key: "qa-1".to_string(),
            question: "What is the capital of France?".to_string(),
            thinking: String::new(),
            answer: answer.to_string(),
            question_type: QuestionType::Factual,
            difficulty: "easy".to_string(),
            confidence: 0.8,
            temperature_used: 0.3,
            source_section: "intro".to_string(),
            source_hash: "abc".to_string(),
            evidence_blocks: vec![],
            relationship_types: vec![],
            related_entities: vec![],
            validation_score: None,
            citation_found: false,
            reversal_of: None,
        }
    }

    #[tokio::test]
    async fn grounded_answer_is_marked_cited_with_a_score() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_collection("documents", false).await.unwrap();
        let doc = Document::new("documents", "text", "The capital of France is Paris, a major European city founded long ago.");
        store.insert_document(&doc).await.unwrap();

        let validator = QaValidator::new(0.6);
        let mut p = pair("The capital of France is Paris, a major European city founded long ago.");
        let valid = validator.validate_one(&store, &doc.id, &mut p).await.unwrap();
        assert!(valid);
        assert!(p.citation_found);
        assert!(p.validation_score.unwrap() >= 0.6);
    }

    #[tokio::test]
    async fn ungrounded_answer_is_not_cited() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_collection("documents", false).await.unwrap();
        let doc = Document::new("documents", "text", "The capital of France is Paris.");
        store.insert_document(&doc).await.unwrap();

        let validator = QaValidator::new(0.9);
        let mut p = pair("The moon is made of green cheese according to folklore.");
        let valid = validator.validate_one(&store, &doc.id, &mut p).await.unwrap();
        assert!(!valid);
        assert!(!p.citation_found);
    }
}
