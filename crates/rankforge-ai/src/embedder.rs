//! ONNX Runtime sentence-embedding backend.
//!
//! Loads a sentence-transformers export (`model.onnx` + `tokenizer.json`
//! in one directory) and produces mean-pooled, L2-normalized vectors.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use rankforge_core::simil::normalize;

use crate::provider::{EmbeddingBatch, EmbeddingProvider};
use crate::AiError;

const DEFAULT_DIM: usize = 384;
const MAX_TOKENS: usize = 256;

/// Real embedding provider backed by a local ONNX sentence model.
pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    model_name: String,
    dim: usize,
}

impl OnnxEmbedder {
    /// Load from a directory containing `model.onnx` and `tokenizer.json`.
    /// The directory name becomes the reported model identifier.
    pub fn load(model_dir: &Path) -> Result<Self, AiError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                return Err(AiError::ModelNotFound(path.clone()));
            }
        }

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(DEFAULT_DIM);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| AiError::Inference(format!("load tokenizer: {e}")))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| AiError::Inference(format!("set truncation: {e}")))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        let model_name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx-embedder".to_string());

        info!(dim, model = %model_name, "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            model_name,
            dim,
        })
    }

    fn run_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>, AiError> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| AiError::Inference(format!("tokenize: {e}")))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Flat [batch_size, seq_len] input tensors.
        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[offset + j] = i64::from(id);
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[offset + j] = i64::from(mask);
            }
            for (j, &tid) in encoding.get_type_ids().iter().enumerate() {
                token_type_ids[offset + j] = i64::from(tid);
            }
        }

        let shape = [batch_size as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.clone().into_boxed_slice()))?;
        let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => type_tensor,
        ])?;

        // Token embeddings: [batch_size, seq_len, dim].
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        if dims.len() != 3 || dims[0] as usize != batch_size || dims[2] as usize != self.dim {
            return Err(AiError::Inference(format!(
                "unexpected output shape {dims:?}, expected [{batch_size}, {seq_len}, {}]",
                self.dim
            )));
        }
        let actual_seq_len = dims[1] as usize;

        // Mean pooling over real tokens only.
        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut pooled = vec![0.0f32; self.dim];
            let mut token_count = 0.0f32;

            for j in 0..actual_seq_len {
                let mask_val = attention_mask[i * seq_len + j] as f32;
                if mask_val > 0.0 {
                    let offset = (i * actual_seq_len + j) * self.dim;
                    for (d, p) in pooled.iter_mut().enumerate() {
                        *p += output_data[offset + d] * mask_val;
                    }
                    token_count += mask_val;
                }
            }

            if token_count > 0.0 {
                for p in &mut pooled {
                    *p /= token_count;
                }
            }
            normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

impl EmbeddingProvider for OnnxEmbedder {
    fn model(&self) -> &str {
        &self.model_name
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn is_available(&self) -> bool {
        true
    }

    fn embed_batch(&mut self, texts: &[&str]) -> Result<EmbeddingBatch, AiError> {
        let embeddings = if texts.is_empty() {
            vec![]
        } else {
            self.run_batch(texts)?
        };
        Ok(EmbeddingBatch {
            embeddings,
            model: self.model_name.clone(),
            dim: self.dim,
        })
    }
}

/// Infer the embedding dimension from the model's first output shape.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}
