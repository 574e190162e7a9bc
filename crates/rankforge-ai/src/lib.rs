//! Embedding generation and ranking inference: ONNX Runtime sessions with
//! a deterministic stub and a heuristic fallback scorer.

mod cache;
#[cfg(feature = "onnx")]
mod embedder;
mod error;
mod heuristic;
mod provider;
#[cfg(feature = "onnx")]
mod ranker;
mod service;
mod stub;

pub use cache::{CacheStats, CachedEmbedder};
#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;
pub use error::AiError;
pub use heuristic::heuristic_score;
pub use provider::{EmbeddingBatch, EmbeddingProvider};
#[cfg(feature = "onnx")]
pub use ranker::RankerModel;
pub use service::{
    ACTIVE_MODEL_FILE, Comparison, InferenceService, Provenance, RankerStatus, ScoredItem,
    read_active_model,
};
pub use stub::HashEmbedder;
