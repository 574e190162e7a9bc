//! External-trainer boundary.
//!
//! Training stays outside this crate: we spawn the trainer process, wait,
//! and parse the artifacts it writes (`ranker.onnx` + metadata + the
//! active-model pointer). The recorded `RankRun` is what the rest of the
//! system sees of a training invocation.

use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use tracing::info;

use rankforge_ai::read_active_model;
use rankforge_core::types::{ModelMetadata, RankRun};
use rankforge_store::RankStore;

/// Metadata filename the trainer writes next to the model.
pub const MODEL_METADATA_FILE: &str = "ranker_metadata.json";

/// How to invoke the external trainer.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Interpreter, e.g. "python3".
    pub python: String,
    /// Trainer script path.
    pub script: PathBuf,
    /// Exported `dataset.jsonl` to train on.
    pub dataset: PathBuf,
    /// Output directory for model artifacts.
    pub models_dir: PathBuf,
    pub epochs: Option<u32>,
}

/// Spawn the trainer, wait for it, parse its artifacts, and record the run.
pub fn run_training(store: &RankStore, cfg: &TrainerConfig) -> anyhow::Result<RankRun> {
    anyhow::ensure!(
        cfg.dataset.exists(),
        "dataset not found: {}",
        cfg.dataset.display()
    );
    std::fs::create_dir_all(&cfg.models_dir)
        .with_context(|| format!("creating models dir {}", cfg.models_dir.display()))?;

    let mut cmd = Command::new(&cfg.python);
    cmd.arg(&cfg.script)
        .arg("--input")
        .arg(&cfg.dataset)
        .arg("--output")
        .arg(&cfg.models_dir);
    if let Some(epochs) = cfg.epochs {
        cmd.arg("--epochs").arg(epochs.to_string());
    }

    info!(script = %cfg.script.display(), dataset = %cfg.dataset.display(), "spawning trainer");
    let status = cmd
        .status()
        .with_context(|| format!("spawning trainer via {}", cfg.python))?;
    anyhow::ensure!(status.success(), "trainer exited with {status}");

    record_run(store, cfg)
}

/// Parse the artifacts of a completed training and persist a [`RankRun`].
///
/// Split out from [`run_training`] so already-produced artifacts can be
/// registered without re-running the trainer.
pub fn record_run(store: &RankStore, cfg: &TrainerConfig) -> anyhow::Result<RankRun> {
    let pointer = read_active_model(&cfg.models_dir)
        .context("reading active model pointer")?
        .context("trainer finished without writing an active model pointer")?;

    let metadata_path = cfg.models_dir.join(&pointer.metadata);
    let meta: ModelMetadata = serde_json::from_str(
        &std::fs::read_to_string(&metadata_path)
            .with_context(|| format!("reading {}", metadata_path.display()))?,
    )
    .context("parsing model metadata")?;

    let model_path = cfg.models_dir.join(&pointer.active_model);
    anyhow::ensure!(
        model_path.exists(),
        "pointer names a missing model: {}",
        model_path.display()
    );

    let run = store.create_run(
        &model_path.to_string_lossy(),
        &metadata_path.to_string_lossy(),
        &meta.dataset_hash,
        meta.train_metrics.clone(),
    )?;
    info!(run = %run.id, hash = %run.dataset_hash, "recorded training run");
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(models_dir: &Path, dataset: &Path) -> TrainerConfig {
        TrainerConfig {
            python: "python3".to_string(),
            script: PathBuf::from("tools/ml/train_ranker.py"),
            dataset: dataset.to_path_buf(),
            models_dir: models_dir.to_path_buf(),
            epochs: None,
        }
    }

    fn write_artifacts(models_dir: &Path) {
        std::fs::write(models_dir.join("ranker.onnx"), b"model bytes").unwrap();
        std::fs::write(
            models_dir.join(MODEL_METADATA_FILE),
            r#"{
                "version": "1.0",
                "embeddingDim": 384,
                "metricsDim": 6,
                "featureNames": ["clarity","impact","relevance","readability","keyword_density","completeness"],
                "datasetHash": "hash-xyz",
                "trainMetrics": {"valAccuracy": 0.88, "valLoss": 0.31},
                "createdAt": "2026-01-01T00:00:00Z",
                "onnxOpSet": 13
            }"#,
        )
        .unwrap();
        std::fs::write(
            models_dir.join("active_model.json"),
            format!(r#"{{"model":"ranker.onnx","metadata":"{MODEL_METADATA_FILE}"}}"#),
        )
        .unwrap();
    }

    #[test]
    fn record_run_parses_artifacts() {
        let store = RankStore::open().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        write_artifacts(tmp.path());

        let cfg = config(tmp.path(), Path::new("unused.jsonl"));
        let run = record_run(&store, &cfg).unwrap();
        assert_eq!(run.dataset_hash, "hash-xyz");
        assert_eq!(run.train_metrics["valAccuracy"], 0.88);

        let latest = store.latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run.id);
    }

    #[test]
    fn record_run_without_pointer_fails() {
        let store = RankStore::open().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = config(tmp.path(), Path::new("unused.jsonl"));
        assert!(record_run(&store, &cfg).is_err());
    }

    #[test]
    fn record_run_with_missing_model_fails() {
        let store = RankStore::open().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        write_artifacts(tmp.path());
        std::fs::remove_file(tmp.path().join("ranker.onnx")).unwrap();

        let cfg = config(tmp.path(), Path::new("unused.jsonl"));
        assert!(record_run(&store, &cfg).is_err());
    }

    #[test]
    fn missing_dataset_rejected_before_spawn() {
        let store = RankStore::open().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = config(tmp.path(), &tmp.path().join("absent.jsonl"));
        let err = run_training(&store, &cfg).unwrap_err();
        assert!(err.to_string().contains("dataset not found"));
    }
}
