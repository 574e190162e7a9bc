//! Embedding provider contract.

use crate::AiError;

/// Result of one batch embedding call. Every vector shares `dim`.
#[derive(Debug, Clone)]
pub struct EmbeddingBatch {
    pub embeddings: Vec<Vec<f32>>,
    pub model: String,
    pub dim: usize,
}

/// A backend that turns text into dense vectors.
///
/// Callers must check [`is_available`](Self::is_available) before depending
/// on a real (non-stub) embedding; an unavailable backend reports so rather
/// than returning wrong-dimension vectors.
pub trait EmbeddingProvider {
    /// Model identifier included in every [`EmbeddingBatch`].
    fn model(&self) -> &str;

    /// Output dimensionality.
    fn dim(&self) -> usize;

    /// Whether the backend can serve real embeddings right now.
    fn is_available(&self) -> bool;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&mut self, texts: &[&str]) -> Result<EmbeddingBatch, AiError>;

    /// Embed a single text.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, AiError> {
        let batch = self.embed_batch(&[text])?;
        batch
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AiError::Inference("empty embedding batch".into()))
    }
}
