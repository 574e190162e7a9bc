use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rankforge_ai::{CachedEmbedder, EmbeddingProvider, InferenceService, OnnxEmbedder};
use rankforge_core::features::extract;
use rankforge_core::types::{Metrics, Platform};
use rankforge_pipeline::{JsonlBenchmarkSource, TrainerConfig, bootstrap, export, run_training};
use rankforge_store::RankStore;

mod display;

#[derive(Parser)]
#[command(
    name = "rankforge",
    version,
    about = "Pairwise content ranking: bootstrap, export, train, score"
)]
struct Cli {
    /// Store database file.
    #[arg(long, global = true, default_value = "rankforge.duckdb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest benchmark content for a platform and generate labeled pairs.
    Bootstrap {
        /// linkedin, github, or resume.
        #[arg(long)]
        platform: String,
        /// JSONL file of {"section", "text"} samples.
        #[arg(long)]
        input: PathBuf,
    },
    /// Export the labeled dataset plus metadata for the external trainer.
    Export {
        #[arg(long, default_value = "export")]
        out: PathBuf,
        #[arg(long, default_value_t = 384)]
        embedding_dim: usize,
    },
    /// Run the external trainer on an exported dataset and record the run.
    Train {
        #[arg(long, default_value = "export/dataset.jsonl")]
        dataset: PathBuf,
        #[arg(long, default_value = "models")]
        models: PathBuf,
        #[arg(long, default_value = "python3")]
        python: String,
        #[arg(long, default_value = "tools/ml/train_ranker.py")]
        script: PathBuf,
        #[arg(long)]
        epochs: Option<u32>,
    },
    /// Show store counts and the active-model status.
    Status {
        #[arg(long, default_value = "models")]
        models: PathBuf,
    },
    /// Score one stored item by id.
    Score {
        item_id: String,
        #[arg(long, default_value = "models")]
        models: PathBuf,
        /// Directory with an ONNX sentence-embedding model.
        #[arg(long)]
        embed_model: Option<PathBuf>,
    },
    /// Compare two stored items.
    Compare {
        a_id: String,
        b_id: String,
        #[arg(long, default_value = "models")]
        models: PathBuf,
        #[arg(long)]
        embed_model: Option<PathBuf>,
    },
    /// Extract features for ad-hoc text and score it heuristically.
    Smoke {
        text: String,
        #[arg(long, default_value = "summary")]
        section: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::debug!("rankforge v{}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();
    let store = RankStore::open_persistent(&cli.db)?;

    match cli.command {
        Commands::Bootstrap { platform, input } => {
            let platform: Platform = platform.parse()?;
            let source = JsonlBenchmarkSource::new(input);
            let report = bootstrap(&store, &source, platform)?;
            display::bootstrap_report(&report);
        }
        Commands::Export { out, embedding_dim } => {
            let report = export(&store, &out, embedding_dim)?;
            display::export_report(&report);
        }
        Commands::Train {
            dataset,
            models,
            python,
            script,
            epochs,
        } => {
            let cfg = TrainerConfig {
                python,
                script,
                dataset,
                models_dir: models,
                epochs,
            };
            let run = run_training(&store, &cfg)?;
            display::training_run(&run);
        }
        Commands::Status { models } => {
            let service = InferenceService::initialize(&models, None);
            display::status(&store, &service.status())?;
        }
        Commands::Score {
            item_id,
            models,
            embed_model,
        } => {
            let item = store.get_item(&item_id)?;
            let mut service = InferenceService::initialize(&models, embedder(embed_model)?);
            let scored = service.score_item(&item);
            display::scored_item(&item, &scored);
        }
        Commands::Compare {
            a_id,
            b_id,
            models,
            embed_model,
        } => {
            let a = store.get_item(&a_id)?;
            let b = store.get_item(&b_id)?;
            let mut service = InferenceService::initialize(&models, embedder(embed_model)?);
            let comparison = service.compare(&a, &b);
            display::comparison(&a, &b, &comparison);
        }
        Commands::Smoke { text, section } => {
            let features = extract(&text, &section);
            let metrics = Metrics::from(features);
            let score = rankforge_ai::heuristic_score(&metrics);
            display::smoke(&metrics, score);
        }
    }
    Ok(())
}

/// Build the optional embedding provider: a cached ONNX embedder when a
/// model directory is given, nothing otherwise (the service zero-fills).
fn embedder(
    model_dir: Option<PathBuf>,
) -> anyhow::Result<Option<Box<dyn EmbeddingProvider>>> {
    match model_dir {
        None => Ok(None),
        Some(dir) => {
            let inner = OnnxEmbedder::load(&dir)?;
            Ok(Some(Box::new(CachedEmbedder::new(inner))))
        }
    }
}
