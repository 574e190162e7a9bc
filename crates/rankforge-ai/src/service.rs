//! Inference service: trained-model scoring with heuristic fallback.
//!
//! The scoring strategy is chosen once at initialization. Load problems
//! are degradation events, not errors: the service settles into heuristic
//! mode and keeps answering. A failed model inference falls back to the
//! heuristic for that call only, so a transient fault does not disable the
//! session. Provenance tags tell callers which path served each result.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use rankforge_core::types::{ActiveModel, RankItem};

use crate::heuristic::heuristic_score;
use crate::provider::EmbeddingProvider;
#[cfg(feature = "onnx")]
use crate::ranker::RankerModel;
use crate::AiError;

/// Filename of the durable active-model pointer inside the models
/// directory. Written by the external trainer on activation.
pub const ACTIVE_MODEL_FILE: &str = "active_model.json";

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Ranker,
    Heuristic,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ranker => "ranker",
            Self::Heuristic => "heuristic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub score: f32,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub a_score: f32,
    pub b_score: f32,
    /// 1 if A is preferred, -1 if B, 0 on an exact tie.
    pub preference: i8,
    /// |a_score - b_score| clamped to [0, 1].
    pub confidence: f32,
    pub provenance: Provenance,
}

/// Informational status report. Not for control flow.
#[derive(Debug, Clone, PartialEq)]
pub struct RankerStatus {
    pub active: bool,
    pub version: Option<String>,
    pub model_path: Option<PathBuf>,
}

enum ScoringStrategy {
    #[cfg(feature = "onnx")]
    Model(RankerModel),
    Heuristic,
}

/// Scoring front-end over the active model (when present) and the
/// heuristic fallback.
pub struct InferenceService {
    strategy: ScoringStrategy,
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    embedder: Option<Box<dyn EmbeddingProvider>>,
}

impl InferenceService {
    /// A service that only ever scores heuristically.
    pub fn heuristic() -> Self {
        Self {
            strategy: ScoringStrategy::Heuristic,
            embedder: None,
        }
    }

    /// Initialize from the durable active-model pointer in `models_dir`.
    ///
    /// Absent pointer, unreadable pointer, and model-load failure all
    /// settle into heuristic mode; none of them raise.
    pub fn initialize(models_dir: &Path, embedder: Option<Box<dyn EmbeddingProvider>>) -> Self {
        let strategy = match read_active_model(models_dir) {
            Ok(None) => {
                info!("no active model pointer; running heuristic-only");
                ScoringStrategy::Heuristic
            }
            Err(e) => {
                warn!(error = %e, "active model pointer unreadable; running heuristic-only");
                ScoringStrategy::Heuristic
            }
            Ok(Some(pointer)) => Self::load_strategy(models_dir, &pointer),
        };
        Self { strategy, embedder }
    }

    #[cfg(feature = "onnx")]
    fn load_strategy(models_dir: &Path, pointer: &ActiveModel) -> ScoringStrategy {
        match RankerModel::load(models_dir, pointer) {
            Ok(model) => ScoringStrategy::Model(model),
            Err(e) => {
                warn!(error = %e, "model load failed; running heuristic-only");
                ScoringStrategy::Heuristic
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    fn load_strategy(_models_dir: &Path, _pointer: &ActiveModel) -> ScoringStrategy {
        warn!("active model present but onnx support is not compiled in; running heuristic-only");
        ScoringStrategy::Heuristic
    }

    /// Score one item, tagged with the path that produced the score.
    pub fn score_item(&mut self, item: &RankItem) -> ScoredItem {
        match &mut self.strategy {
            ScoringStrategy::Heuristic => ScoredItem {
                score: heuristic_score(&item.metrics),
                provenance: Provenance::Heuristic,
            },
            #[cfg(feature = "onnx")]
            ScoringStrategy::Model(model) => {
                match model_score(model, &mut self.embedder, item) {
                    Ok(score) => ScoredItem {
                        score,
                        provenance: Provenance::Ranker,
                    },
                    Err(e) => {
                        warn!(item = %item.id, error = %e, "inference failed; heuristic fallback for this call");
                        ScoredItem {
                            score: heuristic_score(&item.metrics),
                            provenance: Provenance::Heuristic,
                        }
                    }
                }
            }
        }
    }

    /// Compare two items by scoring both in the same mode. A model failure
    /// on either side degrades the whole comparison to heuristic — results
    /// are never mixed-mode.
    pub fn compare(&mut self, a: &RankItem, b: &RankItem) -> Comparison {
        match &mut self.strategy {
            ScoringStrategy::Heuristic => {
                heuristic_compare(a, b)
            }
            #[cfg(feature = "onnx")]
            ScoringStrategy::Model(model) => {
                let scores = match model_score(model, &mut self.embedder, a) {
                    Ok(sa) => model_score(model, &mut self.embedder, b).map(|sb| (sa, sb)),
                    Err(e) => Err(e),
                };
                match scores {
                    Ok((a_score, b_score)) => comparison(a_score, b_score, Provenance::Ranker),
                    Err(e) => {
                        warn!(a = %a.id, b = %b.id, error = %e, "compare inference failed; heuristic fallback");
                        heuristic_compare(a, b)
                    }
                }
            }
        }
    }

    /// Whether a model is active, and its version when so.
    pub fn status(&self) -> RankerStatus {
        match &self.strategy {
            ScoringStrategy::Heuristic => RankerStatus {
                active: false,
                version: None,
                model_path: None,
            },
            #[cfg(feature = "onnx")]
            ScoringStrategy::Model(model) => RankerStatus {
                active: true,
                version: Some(model.version().to_string()),
                model_path: Some(model.model_path().to_path_buf()),
            },
        }
    }
}

/// Read the active-model pointer file, if one exists.
pub fn read_active_model(models_dir: &Path) -> Result<Option<ActiveModel>, AiError> {
    let path = models_dir.join(ACTIVE_MODEL_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

fn heuristic_compare(a: &RankItem, b: &RankItem) -> Comparison {
    comparison(
        heuristic_score(&a.metrics),
        heuristic_score(&b.metrics),
        Provenance::Heuristic,
    )
}

fn comparison(a_score: f32, b_score: f32, provenance: Provenance) -> Comparison {
    let diff = a_score - b_score;
    Comparison {
        a_score,
        b_score,
        preference: if diff > 0.0 {
            1
        } else if diff < 0.0 {
            -1
        } else {
            0
        },
        confidence: diff.abs().clamp(0.0, 1.0),
        provenance,
    }
}

/// Model-path scoring: embed the item's source text when a usable provider
/// is attached, zero-vector otherwise, then run the session.
#[cfg(feature = "onnx")]
fn model_score(
    model: &mut RankerModel,
    embedder: &mut Option<Box<dyn EmbeddingProvider>>,
    item: &RankItem,
) -> Result<f32, AiError> {
    let embedding = match embedder {
        Some(provider) if provider.is_available() && provider.dim() == model.embedding_dim() => {
            provider.embed(&item.source_ref)?
        }
        _ => vec![0.0; model.embedding_dim()],
    };
    let metrics = item.metrics.ordered();
    model.score(&embedding, &metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rankforge_core::features::feature;
    use rankforge_core::types::{Metrics, Platform};

    fn item(id: &str, values: &[(&str, f32)]) -> RankItem {
        let mut metrics = Metrics::new();
        for (name, value) in values {
            metrics.set(name, *value).unwrap();
        }
        RankItem {
            id: id.to_string(),
            platform: Platform::Linkedin,
            section: "summary".to_string(),
            source_ref: format!("text for {id}"),
            embedding_id: None,
            metrics,
            created_at: Utc::now(),
        }
    }

    fn strong_and_weak() -> (RankItem, RankItem) {
        let a = item(
            "a",
            &[
                (feature::CLARITY, 0.9),
                (feature::IMPACT, 0.85),
                (feature::RELEVANCE, 0.8),
                (feature::COMPLETENESS, 0.8),
            ],
        );
        let b = item(
            "b",
            &[
                (feature::CLARITY, 0.5),
                (feature::IMPACT, 0.4),
                (feature::RELEVANCE, 0.5),
                (feature::COMPLETENESS, 0.4),
            ],
        );
        (a, b)
    }

    #[test]
    fn no_active_model_means_heuristic_provenance() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut service = InferenceService::initialize(tmp.path(), None);

        let status = service.status();
        assert!(!status.active);
        assert!(status.version.is_none());

        let (a, _) = strong_and_weak();
        let scored = service.score_item(&a);
        assert_eq!(scored.provenance, Provenance::Heuristic);
        assert!(scored.score > 0.0);
    }

    #[test]
    fn unreadable_pointer_degrades_to_heuristic() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join(ACTIVE_MODEL_FILE), "{not json").unwrap();
        let service = InferenceService::initialize(tmp.path(), None);
        assert!(!service.status().active);
    }

    #[test]
    fn pointer_to_missing_model_degrades_to_heuristic() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(ACTIVE_MODEL_FILE),
            r#"{"activeModel":"ghost.onnx","metadata":"ghost.json"}"#,
        )
        .unwrap();
        let service = InferenceService::initialize(tmp.path(), None);
        assert!(!service.status().active);
    }

    #[test]
    fn heuristic_compare_prefers_stronger_item() {
        let (a, b) = strong_and_weak();
        let mut service = InferenceService::heuristic();
        let cmp = service.compare(&a, &b);
        assert_eq!(cmp.preference, 1);
        assert!(cmp.confidence > 0.0);
        assert_eq!(cmp.provenance, Provenance::Heuristic);
        assert!(cmp.a_score > cmp.b_score);
    }

    #[test]
    fn compare_is_antisymmetric() {
        let (a, b) = strong_and_weak();
        let mut service = InferenceService::heuristic();
        let forward = service.compare(&a, &b);
        let backward = service.compare(&b, &a);
        assert_eq!(forward.preference, -backward.preference);
        assert!((forward.confidence - backward.confidence).abs() < 1e-6);
    }

    #[test]
    fn equal_items_tie_with_zero_confidence() {
        let (a, _) = strong_and_weak();
        let mut service = InferenceService::heuristic();
        let cmp = service.compare(&a, &a.clone());
        assert_eq!(cmp.preference, 0);
        assert_eq!(cmp.confidence, 0.0);
    }

    #[test]
    fn read_active_model_absent_is_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(read_active_model(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn read_active_model_parses_pointer() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(ACTIVE_MODEL_FILE),
            r#"{"model":"ranker.onnx","metadata":"ranker_metadata.json"}"#,
        )
        .unwrap();
        let pointer = read_active_model(tmp.path()).unwrap().unwrap();
        assert_eq!(pointer.active_model, "ranker.onnx");
        assert_eq!(pointer.metadata, "ranker_metadata.json");
    }

    #[test]
    fn provenance_strings() {
        assert_eq!(Provenance::Ranker.as_str(), "ranker");
        assert_eq!(Provenance::Heuristic.as_str(), "heuristic");
        assert_eq!(
            serde_json::to_string(&Provenance::Heuristic).unwrap(),
            "\"heuristic\""
        );
    }
}
