//! Runtime configuration shapes
//!
//! This crate only defines the configuration *shape* and its environment
//! variable defaults (spec §6); loading config from a file, CLI flags, or a
//! secrets manager is an external collaborator's job. `Config::from_env`
//! exists for the CLI entry point and for tests, mirroring the way the
//! teacher resolves `~/.cortexast` defaults via `dirs`.

use crate::qa::types::QuestionType;
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite-backed multi-model store.
    pub db_path: PathBuf,
    /// Logical database name (kept for parity with `ARANGO_DB_NAME`).
    pub db_name: String,
    /// Default embedding dimension used when a collection has no documents
    /// to sample from yet.
    pub embedding_default_dimension: usize,
    /// Default minimum score threshold for searches that don't specify one.
    pub default_threshold: f32,
    /// Default ArangoSearch-style text analyzer name.
    pub default_analyzer: String,
    /// Q&A generation tunables.
    pub qa: QAGenerationConfig,
}

impl Config {
    /// Resolve configuration from environment variables, falling back to
    /// documented defaults (spec §6).
    pub fn from_env() -> Self {
        let db_path = std::env::var("ARANGO_HOST")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        Self {
            db_path,
            db_name: std::env::var("ARANGO_DB_NAME").unwrap_or_else(|_| "knowledge".to_string()),
            embedding_default_dimension: std::env::var("EMBEDDING_DEFAULT_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(768),
            default_threshold: std::env::var("DEFAULT_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),
            default_analyzer: std::env::var("DEFAULT_ANALYZER")
                .unwrap_or_else(|_| "text_en".to_string()),
            qa: QAGenerationConfig::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".plexus-hybrid")
        .join("knowledge.db")
}

/// Q&A generation tunables (spec §4.11 table, verbatim fields).
#[derive(Debug, Clone)]
pub struct QAGenerationConfig {
    pub model: String,
    /// Discrete temperature choices sampled per question.
    pub question_temperature_range: Vec<f32>,
    /// Low temperature used on retries.
    pub answer_temperature: f32,
    pub max_tokens: u32,
    pub batch_size: usize,
    /// Bounds outbound LLM concurrency.
    pub semaphore_limit: usize,
    /// Fuzzy-match cutoff for corpus grounding, in [0,1].
    pub validation_threshold: f32,
    pub min_answer_length: usize,
    pub max_answer_length: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Distribution over question types; must sum to 1.0.
    pub question_type_weights: HashMap<QuestionType, f32>,
    /// Proportion of the batch that gets a reversal pair appended.
    pub reversal_ratio: f32,
}

impl Default for QAGenerationConfig {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert(QuestionType::Factual, 0.3);
        weights.insert(QuestionType::Relationship, 0.2);
        weights.insert(QuestionType::MultiHop, 0.15);
        weights.insert(QuestionType::Hierarchical, 0.15);
        weights.insert(QuestionType::Comparative, 0.2);

        Self {
            model: "default-llm".to_string(),
            question_temperature_range: vec![0.3, 0.5, 0.7],
            answer_temperature: 0.1,
            max_tokens: 1024,
            batch_size: 10,
            semaphore_limit: 10,
            validation_threshold: 0.97,
            min_answer_length: 10,
            max_answer_length: 2000,
            max_retries: 3,
            retry_delay_ms: 200,
            question_type_weights: weights,
            reversal_ratio: 0.2,
        }
    }
}
