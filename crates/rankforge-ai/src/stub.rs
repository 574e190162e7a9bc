//! Deterministic hash-derived embeddings for tests and offline mode.

use rankforge_core::hash::seed64;
use rankforge_core::simil::normalize;

use crate::provider::{EmbeddingBatch, EmbeddingProvider};
use crate::AiError;

const MODEL_NAME: &str = "hash-stub-v1";

/// Stub provider: pseudo-random unit vectors seeded from the text hash.
///
/// Satisfies the full [`EmbeddingProvider`] contract — fixed
/// dimensionality, deterministic output — without any model files.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub const DEFAULT_DIM: usize = 384;

    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIM)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn model(&self) -> &str {
        MODEL_NAME
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        true
    }

    fn embed_batch(&mut self, texts: &[&str]) -> Result<EmbeddingBatch, AiError> {
        let embeddings = texts.iter().map(|t| self.vector(t)).collect();
        Ok(EmbeddingBatch {
            embeddings,
            model: MODEL_NAME.to_string(),
            dim: self.dim,
        })
    }
}

impl HashEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        // xorshift64* over the text-hash seed; zero seeds are forced odd.
        let mut state = seed64(text) | 1;
        let mut v = Vec::with_capacity(self.dim);
        for _ in 0..self.dim {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            v.push((unit * 2.0 - 1.0) as f32);
        }
        normalize(&mut v);
        v
    }
}
