use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("model artifact not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("model metadata mismatch: {0}")]
    MetadataMismatch(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
