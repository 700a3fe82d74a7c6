//! Reversal generator (C14, spec §4.12).
//!
//! Given a batch of forward Q&A pairs, produces a smaller batch of reversed
//! pairs ("Paris is the capital of France" -> "what country has Paris as its
//! capital?"). Strategies are tried in a fixed order, each falling through to
//! the next on a non-match: pattern templates (five named shapes), then a
//! generic entity swap, then a relationship-antonym inversion, then a
//! last-resort generic fallback that always succeeds.

use super::types::{QAPair, QuestionType};
use regex_lite::Regex;

/// `reversal.py::REVERSAL_PATTERNS`, in match order.
fn pattern_definition(pair: &QAPair) -> Option<(String, String)> {
    let re = Regex::new(r"(?i)^what is (?:a|an|the) ([^?]+?)\??$").ok()?;
    let caps = re.captures(pair.question.trim())?;
    let term = caps.get(1)?.as_str().trim();
    Some((format!("What is the term for {}?", pair.answer.trim()), term.to_string()))
}

fn pattern_property(pair: &QAPair) -> Option<(String, String)> {
    let re = Regex::new(r"(?i)^what is the ([^?]+?) of ([^?]+?)\??$").ok()?;
    let caps = re.captures(pair.question.trim())?;
    let property = caps.get(1)?.as_str().trim();
    let entity = caps.get(2)?.as_str().trim();
    let value = pair.answer.trim();
    Some((format!("What is {value} the {property} of?"), entity.to_string()))
}

fn pattern_relationship(pair: &QAPair) -> Option<(String, String)> {
    let re = Regex::new(r"(?i)^what is the relationship between ([^?]+?) and ([^?]+?)\??$").ok()?;
    let caps = re.captures(pair.question.trim())?;
    let a = caps.get(1)?.as_str().trim();
    let b = caps.get(2)?.as_str().trim();
    Some((format!("What is the relationship between {b} and {a}?"), pair.answer.clone()))
}

fn pattern_location(pair: &QAPair) -> Option<(String, String)> {
    let re = Regex::new(r"(?i)^where is ([^?]+?) located\??$").ok()?;
    let caps = re.captures(pair.question.trim())?;
    let entity = caps.get(1)?.as_str().trim();
    Some((format!("What is located in {}?", pair.answer.trim()), entity.to_string()))
}

fn pattern_comparison(pair: &QAPair) -> Option<(String, String)> {
    let re = Regex::new(r"(?i)^is ([^?]+?) (larger|greater|bigger|smaller|better) than ([^?]+?)\??$").ok()?;
    let caps = re.captures(pair.question.trim())?;
    let left = caps.get(1)?.as_str().trim();
    let comparator = caps.get(2)?.as_str();
    let right = caps.get(3)?.as_str().trim();
    let inverse = match comparator {
        "larger" | "bigger" | "greater" => "smaller",
        "smaller" => "larger",
        "better" => "worse",
        other => other,
    };
    Some((format!("Is {right} {inverse} than {left}?"), pair.answer.clone()))
}

const NAMED_PATTERNS: &[fn(&QAPair) -> Option<(String, String)>] =
    &[pattern_definition, pattern_property, pattern_relationship, pattern_location, pattern_comparison];

/// Swaps the last capitalized token in the question with the answer, when
/// the two differ. Covers questions the named patterns don't recognize but
/// that still contain a proper-noun subject worth inverting.
fn entity_swap(pair: &QAPair) -> Option<(String, String)> {
    let entity = pair
        .question
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .last()?
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string();

    if entity.is_empty() || entity.eq_ignore_ascii_case(pair.answer.trim()) {
        return None;
    }
    let new_question = pair.question.replacen(&entity, pair.answer.trim(), 1);
    Some((new_question, entity))
}

/// Relationship-inversion antonym table (spec §4.S), tried against the
/// answer text in either direction.
const ANTONYMS: &[(&str, &str)] = &[
    ("causes", "is caused by"),
    ("leads to", "results from"),
    ("contains", "is contained in"),
    ("precedes", "follows"),
];

fn relationship_inversion(pair: &QAPair) -> Option<(String, String)> {
    let lower = pair.answer.to_lowercase();
    for (forward, backward) in ANTONYMS {
        if let Some(pos) = lower.find(forward) {
            let before = pair.answer[..pos].trim();
            let after = pair.answer[pos + forward.len()..].trim().trim_end_matches('.');
            return Some((format!("What {backward} {after}?"), format!("{after} {backward} {before}").trim().to_string()));
        }
        if let Some(pos) = lower.find(backward) {
            let before = pair.answer[..pos].trim();
            let after = pair.answer[pos + backward.len()..].trim().trim_end_matches('.');
            return Some((format!("What {forward} {after}?"), format!("{after} {forward} {before}").trim().to_string()));
        }
    }
    None
}

fn generic_fallback(pair: &QAPair) -> (String, String) {
    (format!("What question is answered by \"{}\"?", pair.answer.trim()), pair.question.clone())
}

/// Tries every strategy in fixed order and always returns a pair (the
/// generic fallback never fails).
fn reverse_one(pair: &QAPair) -> (String, String) {
    for pattern in NAMED_PATTERNS {
        if let Some(result) = pattern(pair) {
            return result;
        }
    }
    entity_swap(pair).or_else(|| relationship_inversion(pair)).unwrap_or_else(|| generic_fallback(pair))
}

/// Produces `round(reversal_ratio * batch.len())` reversed pairs, one per
/// eligible source pair in order, capped at the batch length.
pub fn generate_reversal_batch(batch: &[QAPair], reversal_ratio: f32) -> Vec<QAPair> {
    let eligible: Vec<&QAPair> = batch.iter().filter(|p| p.question_type != QuestionType::Reversal).collect();
    let target = ((reversal_ratio * batch.len() as f32).round() as usize).min(eligible.len());

    eligible
        .into_iter()
        .take(target)
        .map(|source| {
            let (question, answer) = reverse_one(source);
            QAPair {
                key: format!("{}-rev", source.key),
                question,
                thinking: format!("Reversal of: {}", source.question),
                answer,
                question_type: QuestionType::Reversal,
                difficulty: source.difficulty.clone(),
                confidence: source.confidence * 0.9,
                temperature_used: source.temperature_used,
                source_section: source.source_section.clone(),
                source_hash: source.source_hash.clone(),
                evidence_blocks: source.evidence_blocks.clone(),
                relationship_types: source.relationship_types.clone(),
                related_entities: source.related_entities.clone(),
                validation_score: None,
                citation_found: false,
                reversal_of: Some(source.key.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(question: &str, answer: &str) -> QAPair {
        QAPair {
            key: "qa-1".to_string(),
            question: question.to_string(),
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

    /// Spec §8 scenario 7, verbatim.
    #[test]
    fn scenario_capital_of_france_reverses_via_the_property_pattern() {
        let source = pair("What is the capital of France?", "Paris");
        let reversed = generate_reversal_batch(&[source], 1.0);
        assert_eq!(reversed.len(), 1);
        assert_eq!(reversed[0].question, "What is Paris the capital of?");
        assert_eq!(reversed[0].answer, "France");
        assert_eq!(reversed[0].question_type, QuestionType::Reversal);
    }

    #[test]
    fn reversal_ratio_bounds_the_output_size() {
        let batch: Vec<QAPair> = (0..10).map(|i| pair(&format!("What is the capital of Country{i}?"), "City")).collect();
        let reversed = generate_reversal_batch(&batch, 0.2);
        assert_eq!(reversed.len(), 2);
    }

    #[test]
    fn no_input_pair_in_the_batch_is_already_a_reversal() {
        let batch = vec![pair("What is the capital of France?", "Paris")];
        assert!(batch.iter().all(|p| p.question_type != QuestionType::Reversal));
        let reversed = generate_reversal_batch(&batch, 1.0);
        assert!(reversed.len() <= batch.len());
    }

    #[test]
    fn generic_fallback_always_produces_a_pair() {
        let source = pair("Describe the weather system.", "A slow-moving front.");
        let (q, a) = reverse_one(&source);
        assert!(!q.is_empty());
        assert!(!a.is_empty());
    }
}
