//! Trained pairwise-ranker inference.
//!
//! The external trainer exports an ONNX graph with four inputs
//! (`a_embedding`, `a_metrics`, `b_embedding`, `b_metrics`) and three
//! outputs (`a_score`, `b_score`, `difference`). Single-item scoring feeds
//! the item into the A slot with zeroed B inputs and reads `a_score`.

use std::path::{Path, PathBuf};

use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use rankforge_core::features::FEATURE_NAMES;
use rankforge_core::types::{ActiveModel, ModelMetadata};

use crate::AiError;

/// One loaded ranker model plus its validated metadata.
pub struct RankerModel {
    session: Session,
    meta: ModelMetadata,
    version: String,
    model_path: PathBuf,
}

impl RankerModel {
    /// Load the model an [`ActiveModel`] pointer names, resolving both
    /// artifacts relative to `models_dir`. Fails if either file is missing
    /// or the metadata disagrees with the canonical feature vocabulary.
    pub fn load(models_dir: &Path, pointer: &ActiveModel) -> Result<Self, AiError> {
        let model_path = models_dir.join(&pointer.active_model);
        let metadata_path = models_dir.join(&pointer.metadata);
        if !model_path.exists() {
            return Err(AiError::ModelNotFound(model_path));
        }
        if !metadata_path.exists() {
            return Err(AiError::ModelNotFound(metadata_path));
        }

        let meta: ModelMetadata =
            serde_json::from_str(&std::fs::read_to_string(&metadata_path)?)?;
        if meta.metrics_dim != FEATURE_NAMES.len() {
            return Err(AiError::MetadataMismatch(format!(
                "metricsDim {} != {}",
                meta.metrics_dim,
                FEATURE_NAMES.len()
            )));
        }
        if meta.feature_names != FEATURE_NAMES {
            return Err(AiError::MetadataMismatch(format!(
                "featureNames {:?} differ from the canonical vocabulary",
                meta.feature_names
            )));
        }

        let session = Session::builder()?.commit_from_file(&model_path)?;

        // Version identifier is the metadata filename stem, e.g.
        // "ranker_metadata" for "ranker_metadata.json".
        let version = Path::new(&pointer.metadata)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| pointer.metadata.clone());

        info!(
            version = %version,
            embedding_dim = meta.embedding_dim,
            dataset_hash = %meta.dataset_hash,
            "loaded ranker model"
        );
        Ok(Self {
            session,
            meta,
            version,
            model_path,
        })
    }

    pub fn embedding_dim(&self) -> usize {
        self.meta.embedding_dim
    }

    pub fn metrics_dim(&self) -> usize {
        self.meta.metrics_dim
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.meta
    }

    /// Score one item: its embedding and ordered metrics go into the A
    /// slot, the B slot gets zero vectors.
    pub fn score(&mut self, embedding: &[f32], metrics: &[f32]) -> Result<f32, AiError> {
        if embedding.len() != self.meta.embedding_dim {
            return Err(AiError::Dimension {
                expected: self.meta.embedding_dim,
                actual: embedding.len(),
            });
        }
        if metrics.len() != self.meta.metrics_dim {
            return Err(AiError::Dimension {
                expected: self.meta.metrics_dim,
                actual: metrics.len(),
            });
        }

        let emb_shape = [1i64, self.meta.embedding_dim as i64];
        let met_shape = [1i64, self.meta.metrics_dim as i64];

        let a_emb = Tensor::from_array((emb_shape, embedding.to_vec().into_boxed_slice()))?;
        let a_met = Tensor::from_array((met_shape, metrics.to_vec().into_boxed_slice()))?;
        let b_emb = Tensor::from_array((
            emb_shape,
            vec![0.0f32; self.meta.embedding_dim].into_boxed_slice(),
        ))?;
        let b_met = Tensor::from_array((
            met_shape,
            vec![0.0f32; self.meta.metrics_dim].into_boxed_slice(),
        ))?;

        let outputs = self.session.run(ort::inputs![
            "a_embedding" => a_emb,
            "a_metrics" => a_met,
            "b_embedding" => b_emb,
            "b_metrics" => b_met,
        ])?;

        // Output order: a_score, b_score, difference.
        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;
        data.first()
            .copied()
            .ok_or_else(|| AiError::Inference("empty a_score output".into()))
    }
}
