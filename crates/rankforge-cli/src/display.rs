//! Plain-text rendering for command results.

use rankforge_ai::{Comparison, RankerStatus, ScoredItem};
use rankforge_core::types::{Metrics, RankItem, RankRun};
use rankforge_pipeline::{BootstrapReport, ExportReport};
use rankforge_store::RankStore;

pub fn bootstrap_report(report: &BootstrapReport) {
    println!("Bootstrap complete");
    println!("  items created:  {}", report.items_created);
    println!("  items skipped:  {}", report.items_skipped);
    println!("  pairs created:  {}", report.pairs_created);
    println!("  pairs skipped:  {}", report.pairs_skipped);
}

pub fn export_report(report: &ExportReport) {
    println!("Export complete");
    println!("  dataset:       {}", report.dataset_path.display());
    println!("  metadata:      {}", report.metadata_path.display());
    println!("  items:         {}", report.item_count);
    println!("  pairs:         {}", report.pair_count);
    println!("  skipped pairs: {}", report.skipped_pairs);
    println!("  dataset hash:  {}", report.dataset_hash);
}

pub fn training_run(run: &RankRun) {
    println!("Training run recorded: {}", run.id);
    println!("  model:        {}", run.model_path);
    println!("  dataset hash: {}", run.dataset_hash);
    for (name, value) in &run.train_metrics {
        println!("  {name}: {value:.4}");
    }
}

pub fn status(store: &RankStore, status: &RankerStatus) -> anyhow::Result<()> {
    println!("Store");
    println!("  items: {}", store.count_items(None)?);
    println!("  pairs: {}", store.count_pairs(None)?);
    let dist = store.label_distribution(None)?;
    println!(
        "  labels: A>B {} / equal {} / B>A {}",
        dist.a_preferred, dist.equal, dist.b_preferred
    );
    match store.latest_run()? {
        Some(run) => println!("  latest run: {} ({})", run.id, run.dataset_hash),
        None => println!("  latest run: none"),
    }

    println!("Ranker");
    if status.active {
        println!("  active:  yes");
        if let Some(version) = &status.version {
            println!("  version: {version}");
        }
        if let Some(path) = &status.model_path {
            println!("  model:   {}", path.display());
        }
    } else {
        println!("  active:  no (heuristic fallback)");
    }
    Ok(())
}

pub fn scored_item(item: &RankItem, scored: &ScoredItem) {
    println!(
        "{} [{} / {}]: {:.4} ({})",
        item.id,
        item.platform,
        item.section,
        scored.score,
        scored.provenance.as_str()
    );
}

pub fn comparison(a: &RankItem, b: &RankItem, cmp: &Comparison) {
    println!("A {}: {:.4}", a.id, cmp.a_score);
    println!("B {}: {:.4}", b.id, cmp.b_score);
    let verdict = match cmp.preference {
        1 => "A preferred",
        -1 => "B preferred",
        _ => "tie",
    };
    println!(
        "{verdict} (confidence {:.4}, {})",
        cmp.confidence,
        cmp.provenance.as_str()
    );
}

pub fn smoke(metrics: &Metrics, score: f32) {
    println!("Features");
    for (name, value) in metrics.iter() {
        println!("  {name:16} {value:.4}");
    }
    println!("Heuristic score: {score:.4}");
}
