//! LLM completion service contract (spec §6 item 3, external collaborator).
//!
//! `complete` takes a schema so the generator (C13) never has to parse
//! free-form text — any response that doesn't validate against the schema is
//! a retryable `ProviderFailure` (spec §9 "LLM response parsing").

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("llm provider error: {0}")]
    Provider(String),
    #[error("response did not match the requested schema: {0}")]
    SchemaMismatch(String),
    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// When set, the provider must return JSON validating against this
    /// schema (spec §9: schema-validated JSON mode, never free text).
    pub response_schema: Option<Value>,
}

/// `complete(prompt, model, temperature, max_tokens, response_schema?)`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Value, LlmError>;
}

/// Deterministic stand-in used by tests and by the default build. Echoes a
/// plausible schema-shaped object built from the prompt so the generator's
/// retry/validation loop has something real to exercise without a network
/// call.
pub struct MockLlmClient {
    pub fail_until_attempt: u32,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self { fail_until_attempt: 0 }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Value, LlmError> {
        if request.prompt.trim().is_empty() {
            return Err(LlmError::Provider("empty prompt".to_string()));
        }
        let snippet: String = request.prompt.chars().take(80).collect();
        Ok(serde_json::json!({
            "question": format!("What does this describe: {snippet}?"),
            "thinking": "Derived directly from the supplied source text.",
            "answer": snippet,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_rejects_empty_prompt() {
        let client = MockLlmClient::default();
        let req = CompletionRequest {
            prompt: String::new(),
            model: "test".to_string(),
            temperature: 0.5,
            max_tokens: 100,
            response_schema: None,
        };
        assert!(client.complete(req).await.is_err());
    }
}
