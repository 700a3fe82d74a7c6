//! Embedding service contract (C1, external collaborator — spec §6 item 2).
//!
//! `Embedder` is the trait every embedding-dependent component (C2, C5, C13)
//! programs against. The default build ships [`MockEmbedder`], a
//! deterministic hash-based embedder good enough for tests and for running
//! the crate without downloading a model; the `embeddings` feature swaps in
//! [`FastEmbedEmbedder`], mirroring the way the teacher gates its
//! `FastEmbedEmbedder` behind the same feature.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding model returned no results")]
    EmptyResult,
    #[error("embedding model error: {0}")]
    ModelError(String),
}

/// `embed(text) -> vector<f32>` (spec §6): a fixed-dimension vector for the
/// configured model. Failure is represented as `Err`, which C5/C13 treat as
/// a `ProviderFailure` business error rather than an infrastructure panic.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str;
    fn dimensions(&self) -> usize;
}

/// Deterministic, dependency-free stand-in for a real embedding model.
/// Hashes overlapping trigrams of the input into a fixed-width vector so that
/// similar text produces similar (not identical) vectors — enough signal for
/// semantic-search tests without needing model weights on disk.
pub struct MockEmbedder {
    dimensions: usize,
    model_name: String,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model_name: "mock-hash-embedder".to_string(),
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(768)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyResult);
        }
        let mut vector = vec![0.0f32; self.dimensions];
        let normalized = text.to_lowercase();
        let bytes: Vec<char> = normalized.chars().collect();
        let window = 3usize;
        if bytes.len() < window {
            let mut hasher = DefaultHasher::new();
            normalized.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimensions;
            vector[bucket] = 1.0;
        } else {
            for gram in bytes.windows(window) {
                let mut hasher = DefaultHasher::new();
                gram.hash(&mut hasher);
                let bucket = (hasher.finish() as usize) % self.dimensions;
                vector[bucket] += 1.0;
            }
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(feature = "embeddings")]
mod fastembed_impl {
    use super::{Embedder, EmbeddingError};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use std::sync::Mutex;

    /// Production embedder backed by fastembed (ONNX Runtime). Wrapped in a
    /// `Mutex` because `TextEmbedding::embed` takes `&mut self` while
    /// `Embedder` is `&self`.
    pub struct FastEmbedEmbedder {
        model: Mutex<TextEmbedding>,
        dimensions: usize,
        model_name: String,
    }

    impl FastEmbedEmbedder {
        pub fn new(model: EmbeddingModel, dimensions: usize) -> Result<Self, EmbeddingError> {
            let model_name = format!("{model:?}");
            let options = InitOptions::new(model).with_show_download_progress(false);
            let embedding =
                TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            Ok(Self { model: Mutex::new(embedding), dimensions, model_name })
        }

        pub fn default_model() -> Result<Self, EmbeddingError> {
            Self::new(EmbeddingModel::NomicEmbedTextV15, 768)
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let mut model = self.model.lock().unwrap();
            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
            embeddings.into_iter().next().ok_or(EmbeddingError::EmptyResult)
        }

        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }
}

#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_rejects_empty_text() {
        let embedder = MockEmbedder::new(16);
        assert!(embedder.embed("").await.is_err());
    }

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
