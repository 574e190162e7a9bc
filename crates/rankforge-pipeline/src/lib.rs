//! Data-lifecycle pipelines: benchmark bootstrap, dataset export, and the
//! external-trainer boundary.

mod bootstrap;
mod export;
mod train;

pub use bootstrap::{
    BenchmarkSample, BenchmarkSource, BootstrapReport, JsonlBenchmarkSource, bootstrap,
    quality_score,
};
pub use export::{DATASET_FILE, DatasetMetadata, ExportReport, LAST_EXPORT_HASH_KEY, METADATA_FILE, export};
pub use train::{MODEL_METADATA_FILE, TrainerConfig, run_training};
