//! Q&A data model (spec §3) — `QuestionType`, `QAPair`, `QABatch`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The nine question categories a `QAPair` can carry (spec §3).
///
/// `REVERSAL` pairs are never produced by the main generation loop (C13);
/// they're appended afterward by `generate_reversal_batch` (C14).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Factual,
    Relationship,
    MultiHop,
    Hierarchical,
    Comparative,
    Reversal,
    Causal,
    Definitional,
    Procedural,
}

impl QuestionType {
    /// `base_type_weight` table used by edge-weight computation (spec
    /// "Weight" formula in the contribution-merging section).
    pub fn base_weight(&self) -> f32 {
        match self {
            QuestionType::Factual => 0.9,
            QuestionType::Definitional => 0.85,
            QuestionType::Relationship => 0.8,
            QuestionType::Causal => 0.8,
            QuestionType::Procedural => 0.75,
            QuestionType::Hierarchical => 0.7,
            QuestionType::Comparative => 0.7,
            QuestionType::MultiHop => 0.6,
            QuestionType::Reversal => 0.5,
        }
    }

    /// The types the main generation loop (C13) can produce directly.
    /// `Reversal` is excluded — it's only ever produced by C14.
    pub fn generative_variants() -> &'static [QuestionType] {
        &[
            QuestionType::Factual,
            QuestionType::Relationship,
            QuestionType::MultiHop,
            QuestionType::Hierarchical,
            QuestionType::Comparative,
            QuestionType::Causal,
            QuestionType::Definitional,
            QuestionType::Procedural,
        ]
    }
}

/// A generated (and possibly validated) question/answer pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QAPair {
    pub key: String,
    pub question: String,
    pub thinking: String,
    pub answer: String,
    pub question_type: QuestionType,
    pub difficulty: String,
    /// In `[0, 1]`.
    pub confidence: f32,
    /// In `[0, 1]`; the sampling temperature used to generate the question.
    pub temperature_used: f32,
    pub source_section: String,
    pub source_hash: String,
    pub evidence_blocks: Vec<String>,
    pub relationship_types: Vec<String>,
    pub related_entities: Vec<String>,
    /// In `[0, 1]`, set by the validator (C15); `None` until validated.
    pub validation_score: Option<f32>,
    pub citation_found: bool,
    /// Set only on pairs produced by `generate_reversal_batch` (C14).
    pub reversal_of: Option<String>,
}

impl QAPair {
    /// Invariant 5 (spec §3): a pair with `citation_found` must clear the
    /// validation threshold it was checked against.
    pub fn satisfies_citation_invariant(&self, validation_threshold: f32) -> bool {
        if !self.citation_found {
            return true;
        }
        self.validation_score
            .map(|s| s >= validation_threshold)
            .unwrap_or(false)
    }
}

/// The result of running C13 (and optionally C14/C15) over one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QABatch {
    pub qa_pairs: Vec<QAPair>,
    pub document_id: String,
    pub generation_time: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub total_pairs: usize,
    pub valid_pairs: usize,
}

impl QABatch {
    pub fn new(document_id: impl Into<String>, qa_pairs: Vec<QAPair>) -> Self {
        let total_pairs = qa_pairs.len();
        let valid_pairs = qa_pairs.iter().filter(|p| p.citation_found).count();
        Self {
            qa_pairs,
            document_id: document_id.into(),
            generation_time: Utc::now(),
            metadata: serde_json::Value::Null,
            total_pairs,
            valid_pairs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_weight_ranks_factual_above_reversal() {
        assert!(QuestionType::Factual.base_weight() > QuestionType::Reversal.base_weight());
    }

    #[test]
    fn generative_variants_exclude_reversal() {
        assert!(!QuestionType::generative_variants().contains(&QuestionType::Reversal));
    }

    #[test]
    fn citation_invariant_requires_threshold_when_cited() {
        let mut pair = sample_pair();
        pair.citation_found = true;
        pair.validation_score = Some(0.5);
        assert!(!pair.satisfies_citation_invariant(0.9));
        pair.validation_score = Some(0.95);
        assert!(pair.satisfies_citation_invariant(0.9));
    }

    fn sample_pair() -> QAPair {
        QAPair {
            key: "qa-1".into(),
            question: "What is X?".into(),
            thinking: "".into(),
            answer: "X is Y".into(),
            question_type: QuestionType::Factual,
            difficulty: "easy".into(),
            confidence: 0.8,
            temperature_used: 0.5,
            source_section: "intro".into(),
            source_hash: "abc123".into(),
            evidence_blocks: vec![],
            relationship_types: vec![],
            related_entities: vec![],
            validation_score: None,
            citation_found: false,
            reversal_of: None,
        }
    }
}
