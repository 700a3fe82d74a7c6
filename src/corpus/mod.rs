//! Corpus validator (C3) — fuzzy-matches a candidate answer against a
//! document's source corpus. C15 (Q&A validator) reuses this exact contract.
//!
//! Segmentation and scoring follow `validator.py::_extract_answer_segments`
//! precisely (SPEC_FULL §3.S): split on `". "`, drop segments under 20
//! chars, truncate kept segments to 50 chars for scoring, and always also
//! include the full first sentence verbatim when it's <= 100 chars.

use crate::document::DocumentId;
use crate::error::StoreResult;
use crate::storage::{CorpusBlock, Store};
use dashmap::DashMap;
use strsim::normalized_levenshtein;

const MIN_SEGMENT_LEN: usize = 20;
const SEGMENT_SCORE_WINDOW: usize = 50;
const FIRST_SENTENCE_MAX_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub score: f32,
    pub matched_block_id: Option<String>,
    pub matched_text: Option<String>,
}

/// Per-process corpus cache (spec §9 "Global caches"): read-mostly, rebuilt
/// idempotently, last-writer-wins under concurrent population.
pub struct CorpusValidator {
    cache: DashMap<String, Vec<CorpusBlock>>,
    threshold: f32,
}

impl CorpusValidator {
    pub fn new(threshold: f32) -> Self {
        Self { cache: DashMap::new(), threshold }
    }

    pub fn invalidate(&self, document_id: &DocumentId) {
        self.cache.remove(document_id.as_str());
    }

    async fn corpus_for(&self, store: &dyn Store, document_id: &DocumentId) -> StoreResult<Vec<CorpusBlock>> {
        if let Some(blocks) = self.cache.get(document_id.as_str()) {
            return Ok(blocks.clone());
        }
        let blocks = store.corpus_blocks(document_id).await?;
        self.cache.insert(document_id.as_str().to_string(), blocks.clone());
        Ok(blocks)
    }

    /// `validate(answer, document_id) -> {valid, score, matched_block_id?, matched_text?}`.
    pub async fn validate(
        &self,
        store: &dyn Store,
        answer: &str,
        document_id: &DocumentId,
    ) -> StoreResult<ValidationResult> {
        let blocks = self.corpus_for(store, document_id).await?;
        Ok(self.validate_against(answer, &blocks))
    }

    /// Pure scoring core, split out so C15's batch mode can reuse a
    /// once-loaded corpus across many pairs without redundant store calls.
    pub fn validate_against(&self, answer: &str, blocks: &[CorpusBlock]) -> ValidationResult {
        let segments = extract_answer_segments(answer);
        if segments.is_empty() || blocks.is_empty() {
            return ValidationResult { valid: false, score: 0.0, matched_block_id: None, matched_text: None };
        }

        let mut best_score = 0.0f32;
        let mut best_block: Option<&CorpusBlock> = None;

        for segment in &segments {
            for block in blocks {
                let score = partial_ratio(segment, &block.text);
                if score > best_score {
                    best_score = score;
                    best_block = Some(block);
                }
            }
        }

        ValidationResult {
            valid: best_score >= self.threshold,
            score: best_score,
            matched_block_id: best_block.map(|b| b.block_id.clone()),
            matched_text: best_block.map(|b| b.text.clone()),
        }
    }

    /// Batch mode: validates many `(answer, document_id)` pairs concurrently,
    /// loading each distinct document's corpus only once (spec §4.2).
    pub async fn validate_batch(
        &self,
        store: &dyn Store,
        pairs: &[(String, DocumentId)],
    ) -> StoreResult<Vec<ValidationResult>> {
        let mut results = Vec::with_capacity(pairs.len());
        for (answer, document_id) in pairs {
            results.push(self.validate(store, answer, document_id).await?);
        }
        Ok(results)
    }
}

/// `validator.py::_extract_answer_segments` ported verbatim (SPEC_FULL §3.S).
fn extract_answer_segments(answer: &str) -> Vec<String> {
    let mut segments: Vec<String> = answer
        .split(". ")
        .map(|s| s.trim())
        .filter(|s| s.len() >= MIN_SEGMENT_LEN)
        .map(|s| truncate_chars(s, SEGMENT_SCORE_WINDOW))
        .collect();

    if let Some(first) = answer.split(". ").next() {
        let first = first.trim();
        if !first.is_empty() && first.chars().count() <= FIRST_SENTENCE_MAX_LEN {
            segments.push(first.to_string());
        }
    }

    segments
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// RapidFuzz-style `partial_ratio`: the best-aligning substring of the
/// longer string scored against the shorter one via normalized similarity.
/// `strsim` has no native partial-ratio, so this slides the shorter string's
/// length as a window over the longer one and keeps the best match — the
/// closest idiomatic approximation available without a RapidFuzz-equivalent
/// crate in the pack (SPEC_FULL §0).
fn partial_ratio(needle: &str, haystack: &str) -> f32 {
    let needle = needle.to_lowercase();
    let haystack = haystack.to_lowercase();

    if needle.is_empty() || haystack.is_empty() {
        return 0.0;
    }
    if haystack.len() <= needle.len() {
        return normalized_levenshtein(&needle, &haystack) as f32;
    }

    let haystack_chars: Vec<char> = haystack.chars().collect();
    let window = needle.chars().count().max(1);
    let mut best = 0.0f32;
    let mut i = 0;
    while i + window <= haystack_chars.len() {
        let candidate: String = haystack_chars[i..i + window].iter().collect();
        let score = normalized_levenshtein(&needle, &candidate) as f32;
        if score > best {
            best = score;
        }
        i += 1;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CorpusBlockType;

    #[test]
    fn segments_drop_short_sentences_and_keep_first_sentence() {
        let answer = "Short. This sentence is definitely long enough to keep as a segment.";
        let segments = extract_answer_segments(answer);
        assert!(segments.iter().any(|s| s.starts_with("This sentence")));
        assert!(!segments.iter().any(|s| s == "Short"));
    }

    #[test]
    fn partial_ratio_finds_exact_substring() {
        let score = partial_ratio("Paris", "The capital of France is Paris, a major city.");
        assert!(score > 0.99);
    }

    #[test]
    fn validate_against_requires_threshold() {
        let validator = CorpusValidator::new(0.9);
        let blocks = vec![CorpusBlock {
            block_id: "b1".to_string(),
            block_type: CorpusBlockType::Text,
            text: "The capital of France is Paris.".to_string(),
        }];
        let result = validator.validate_against("The capital of France is definitely Paris and nothing else.", &blocks);
        assert!(result.score > 0.0);
    }
}
