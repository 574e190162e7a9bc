//! Content-hash cache around any embedding provider.
//!
//! Keys are SHA-256 hashes of the input text, so a content change is a new
//! key and entries never need invalidation. Unbounded by default; callers
//! wanting eviction wrap [`clear`](CachedEmbedder::clear) with their own
//! policy.

use std::collections::HashMap;

use rankforge_core::hash::text_hash;

use crate::provider::{EmbeddingBatch, EmbeddingProvider};
use crate::AiError;

/// Cache introspection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Caching wrapper that satisfies the same provider contract as its inner
/// backend. Batch requests compute only the uncached texts and reassemble
/// results in input order.
pub struct CachedEmbedder<P> {
    inner: P,
    entries: HashMap<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

impl<P: EmbeddingProvider> CachedEmbedder<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Drop every cached entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up a cached vector by its text hash.
    pub fn get(&self, text_hash: &str) -> Option<&[f32]> {
        self.entries.get(text_hash).map(Vec::as_slice)
    }
}

impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<P> {
    fn model(&self) -> &str {
        self.inner.model()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn embed_batch(&mut self, texts: &[&str]) -> Result<EmbeddingBatch, AiError> {
        let keys: Vec<String> = texts.iter().map(|t| text_hash(t)).collect();

        // Partition into cached and to-compute, deduplicating repeated
        // uncached texts within the batch.
        let mut miss_keys: Vec<&str> = Vec::new();
        let mut miss_texts: Vec<&str> = Vec::new();
        for (key, text) in keys.iter().zip(texts) {
            if self.entries.contains_key(key) {
                self.hits += 1;
            } else {
                self.misses += 1;
                if !miss_keys.contains(&key.as_str()) {
                    miss_keys.push(key);
                    miss_texts.push(text);
                }
            }
        }

        if !miss_texts.is_empty() {
            let computed = self.inner.embed_batch(&miss_texts)?;
            for (key, vector) in miss_keys.iter().zip(computed.embeddings) {
                self.entries.insert((*key).to_string(), vector);
            }
        }

        let embeddings = keys
            .iter()
            .map(|key| {
                self.entries
                    .get(key)
                    .cloned()
                    .ok_or_else(|| AiError::Inference("cache entry missing after compute".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EmbeddingBatch {
            embeddings,
            model: self.inner.model().to_string(),
            dim: self.inner.dim(),
        })
    }
}
