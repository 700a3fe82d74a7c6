//! Q&A generator (C13, spec §4.11).

use super::types::{QAPair, QuestionType};
use crate::config::QAGenerationConfig;
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use futures::future::join_all;
use rand::seq::SliceRandom;
use serde_json::Value;
use sha2_free_hash::short_hash;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A document section supplied by the ingestion adapter (spec §6 item 4).
#[derive(Debug, Clone)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub level: u32,
    pub text: String,
    pub content_hash: String,
}

/// An inter-section relationship supplied by the ingestion adapter.
#[derive(Debug, Clone)]
pub struct SectionRelationship {
    pub from_id: String,
    pub to_id: String,
    pub relationship_type: String,
    pub confidence: f32,
}

pub struct QaGenerator {
    llm: Arc<dyn LlmClient>,
    config: QAGenerationConfig,
}

/// `_calculate_type_distribution`: `floor(weight * total)` per type, then the
/// remainder distributed one-by-one to the largest fractional remainders,
/// descending (SPEC_FULL §4.S) — not naive rounding.
pub fn calculate_type_distribution(weights: &std::collections::HashMap<QuestionType, f32>, total: usize) -> Vec<(QuestionType, usize)> {
    let mut raw: Vec<(QuestionType, f32)> = weights.iter().map(|(qt, w)| (*qt, w * total as f32)).collect();
    raw.sort_by(|a, b| a.0.base_weight().partial_cmp(&b.0.base_weight()).unwrap());

    let mut counts: Vec<(QuestionType, usize, f32)> = raw
        .iter()
        .map(|(qt, r)| (*qt, r.floor() as usize, r.fract()))
        .collect();

    let assigned: usize = counts.iter().map(|(_, c, _)| c).sum();
    let mut remainder = total.saturating_sub(assigned);

    counts.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    let mut i = 0;
    while remainder > 0 && !counts.is_empty() {
        counts[i % counts.len()].1 += 1;
        remainder -= 1;
        i += 1;
    }

    counts.into_iter().map(|(qt, c, _)| (qt, c)).collect()
}

impl QaGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, config: QAGenerationConfig) -> Self {
        Self { llm, config }
    }

    /// Generates a full batch: distributes `max_pairs` across the
    /// generative question types (Reversal is excluded — C14 owns it),
    /// dispatches each generation task under a bounded semaphore.
    pub async fn generate_batch(
        &self,
        document_id: &str,
        sections: &[Section],
        relationships: &[SectionRelationship],
        max_pairs: usize,
    ) -> Vec<QAPair> {
        let distribution = calculate_type_distribution(&self.config.question_type_weights, max_pairs);
        let semaphore = Arc::new(Semaphore::new(self.config.semaphore_limit.max(1)));

        let mut tasks = Vec::new();
        for (question_type, count) in distribution {
            if question_type == QuestionType::Reversal {
                continue;
            }
            for _ in 0..count {
                let semaphore = Arc::clone(&semaphore);
                let sections = sections.to_vec();
                let relationships = relationships.to_vec();
                let document_id = document_id.to_string();
                tasks.push(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    self.generate_one(question_type, &document_id, &sections, &relationships).await
                });
            }
        }

        // `join_all` drives every task concurrently against the same
        // `&self`, so at most `semaphore_limit` permits are held outstanding
        // at once instead of the tasks running one after another.
        let results = join_all(tasks).await;
        results.into_iter().flatten().collect()
    }

    async fn generate_one(
        &self,
        question_type: QuestionType,
        document_id: &str,
        sections: &[Section],
        relationships: &[SectionRelationship],
    ) -> Option<QAPair> {
        let prompt = self.build_prompt(question_type, sections, relationships)?;
        let mut rng = rand::thread_rng();
        let mut errors: Vec<String> = Vec::new();

        for attempt in 0..=self.config.max_retries {
            let temperature = if attempt == 0 {
                *self
                    .config
                    .question_temperature_range
                    .choose(&mut rng)
                    .unwrap_or(&self.config.answer_temperature)
            } else {
                self.config.answer_temperature
            };

            let mut full_prompt = prompt.clone();
            if !errors.is_empty() {
                full_prompt.push_str("\n\nPrevious attempt failed validation:\n");
                full_prompt.push_str(&errors.join("\n"));
            }

            let request = CompletionRequest {
                prompt: full_prompt,
                model: self.config.model.clone(),
                temperature,
                max_tokens: self.config.max_tokens,
                response_schema: Some(qa_schema()),
            };

            match self.llm.complete(request).await {
                Ok(value) => match self.validate_and_build(value, question_type, document_id, sections, temperature) {
                    Ok(pair) => return Some(pair),
                    Err(reason) => errors.push(reason),
                },
                Err(LlmError::Timeout) => return None,
                Err(e) => errors.push(e.to_string()),
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(std::time::Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }
        None
    }

    fn validate_and_build(
        &self,
        value: Value,
        question_type: QuestionType,
        document_id: &str,
        sections: &[Section],
        temperature: f32,
    ) -> Result<QAPair, String> {
        let question = value.get("question").and_then(Value::as_str).ok_or("missing question field")?;
        let thinking = value.get("thinking").and_then(Value::as_str).unwrap_or_default();
        let answer = value.get("answer").and_then(Value::as_str).ok_or("missing answer field")?;

        if answer.len() < self.config.min_answer_length {
            return Err("answer too short".to_string());
        }
        if answer.len() > self.config.max_answer_length {
            return Err("answer too long".to_string());
        }

        let grounded = sections.iter().any(|s| s.text.contains(answer) || answer.contains(&s.title));
        if !grounded {
            return Err("answer does not reference any source content".to_string());
        }

        let source_section = sections.first().map(|s| s.id.clone()).unwrap_or_default();
        let source_hash = sections.first().map(|s| s.content_hash.clone()).unwrap_or_else(|| short_hash(answer));

        Ok(QAPair {
            key: format!("qa-{}", short_hash(&format!("{document_id}{question}"))),
            question: question.to_string(),
            thinking: thinking.to_string(),
            answer: answer.to_string(),
            question_type,
            difficulty: "medium".to_string(),
            confidence: 0.8,
            temperature_used: temperature,
            source_section,
            source_hash,
            evidence_blocks: sections.iter().map(|s| s.id.clone()).collect(),
            relationship_types: vec![],
            related_entities: vec![],
            validation_score: None,
            citation_found: false,
            reversal_of: None,
        })
    }

    fn build_prompt(
        &self,
        question_type: QuestionType,
        sections: &[Section],
        relationships: &[SectionRelationship],
    ) -> Option<String> {
        match question_type {
            QuestionType::Factual | QuestionType::Definitional | QuestionType::Procedural | QuestionType::Causal => {
                let section = sections.first()?;
                Some(format!(
                    "Write a {:?} question and answer grounded strictly in this section titled \"{}\":\n{}",
                    question_type, section.title, section.text
                ))
            }
            QuestionType::Relationship => {
                let rel = relationships.first()?;
                Some(format!(
                    "Explain how these two pieces relate (relationship type \"{}\", confidence {}): {} -> {}",
                    rel.relationship_type, rel.confidence, rel.from_id, rel.to_id
                ))
            }
            QuestionType::MultiHop => {
                let path = random_walk(relationships, 3)?;
                Some(format!("Ask a question whose answer requires reasoning across this chain of relationships: {path:?}"))
            }
            QuestionType::Hierarchical => {
                let grouped: Vec<(u32, &str)> = sections.iter().map(|s| (s.level, s.title.as_str())).collect();
                Some(format!("Ask a question about the structural relationship between these sections: {grouped:?}"))
            }
            QuestionType::Comparative => {
                let same_level: Vec<&Section> = sections.iter().filter(|s| s.level == sections.first()?.level).collect();
                if same_level.len() < 2 {
                    return None;
                }
                Some(format!(
                    "Compare and contrast \"{}\" and \"{}\".",
                    same_level[0].title, same_level[1].title
                ))
            }
            QuestionType::Reversal => None,
        }
    }
}

/// `generator.py::_random_walk`: bounded-length random walk through the
/// relationship graph, never revisiting a node (SPEC_FULL §4.S).
fn random_walk(relationships: &[SectionRelationship], max_len: usize) -> Option<Vec<String>> {
    if relationships.is_empty() {
        return None;
    }
    let mut rng = rand::thread_rng();
    let start = relationships.choose(&mut rng)?;
    let mut path = vec![start.from_id.clone(), start.to_id.clone()];
    let mut visited: HashSet<String> = path.iter().cloned().collect();
    let mut current = start.to_id.clone();

    while path.len() < max_len.max(2) {
        let candidates: Vec<&SectionRelationship> =
            relationships.iter().filter(|r| r.from_id == current && !visited.contains(&r.to_id)).collect();
        let Some(next) = candidates.choose(&mut rng) else { break };
        path.push(next.to_id.clone());
        visited.insert(next.to_id.clone());
        current = next.to_id.clone();
    }
    Some(path)
}

fn qa_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["question", "thinking", "answer"],
        "properties": {
            "question": {"type": "string"},
            "thinking": {"type": "string"},
            "answer": {"type": "string"}
        }
    })
}

/// A tiny, dependency-free content hash (FNV-1a) used only to derive stable
/// QA keys and fallback source hashes — not a security primitive.
mod sha2_free_hash {
    pub fn short_hash(input: &str) -> String {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in input.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        format!("{hash:016x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_distribution_sums_to_total_via_largest_remainder() {
        let mut weights = std::collections::HashMap::new();
        weights.insert(QuestionType::Factual, 0.3);
        weights.insert(QuestionType::Relationship, 0.2);
        weights.insert(QuestionType::MultiHop, 0.15);
        weights.insert(QuestionType::Hierarchical, 0.15);
        weights.insert(QuestionType::Comparative, 0.2);

        let distribution = calculate_type_distribution(&weights, 10);
        let total: usize = distribution.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 10);
    }
}
