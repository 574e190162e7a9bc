//! Benchmark ingestion and heuristic pair generation.
//!
//! Pair generation walks the freshly created items in insertion order and
//! pairs each with its wrap-around neighbour, orienting the higher scorer
//! into slot A with label 1. The resulting dataset therefore contains only
//! positive-direction labels from bootstrap — no B>A and no ties. That
//! skew is preserved on purpose; symmetrizing it would change the trained
//! model's calibration and needs an explicit decision.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use rankforge_core::features::{extract, feature};
use rankforge_core::types::{Label, Metrics, PairSource, Platform};
use rankforge_store::RankStore;

/// Truncation cap for source references derived from sample text.
const SOURCE_REF_MAX: usize = 512;

/// Fixed quality weights for bootstrap pair labeling: clarity 0.3,
/// impact 0.3, relevance 0.2, completeness 0.2. Distinct from the
/// inference-time heuristic scorer.
const QUALITY_WEIGHTS: [(&str, f32); 4] = [
    (feature::CLARITY, 0.3),
    (feature::IMPACT, 0.3),
    (feature::RELEVANCE, 0.2),
    (feature::COMPLETENESS, 0.2),
];

/// One piece of benchmark content to turn into a rank item.
#[derive(Debug, Clone, Deserialize)]
pub struct BenchmarkSample {
    pub section: String,
    pub text: String,
    /// Explicit source reference; derived from the text when absent.
    #[serde(default)]
    pub source_ref: Option<String>,
}

impl BenchmarkSample {
    fn source_ref(&self) -> String {
        match &self.source_ref {
            Some(r) => r.clone(),
            None => self.text.chars().take(SOURCE_REF_MAX).collect(),
        }
    }
}

/// External collaborator seam: wherever ingested benchmark content lives.
pub trait BenchmarkSource {
    fn samples(&self, platform: Platform) -> anyhow::Result<Vec<BenchmarkSample>>;
}

/// Benchmark content stored as one JSON object per line:
/// `{"section": "headline", "text": "..."}`.
pub struct JsonlBenchmarkSource {
    path: PathBuf,
}

impl JsonlBenchmarkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BenchmarkSource for JsonlBenchmarkSource {
    fn samples(&self, _platform: Platform) -> anyhow::Result<Vec<BenchmarkSample>> {
        let file = File::open(&self.path)
            .with_context(|| format!("opening benchmark file {}", self.path.display()))?;
        let mut samples = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sample: BenchmarkSample = serde_json::from_str(&line)
                .with_context(|| format!("parsing benchmark line {}", line_no + 1))?;
            samples.push(sample);
        }
        Ok(samples)
    }
}

/// Counts from one bootstrap invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub items_created: usize,
    pub items_skipped: usize,
    pub pairs_created: usize,
    pub pairs_skipped: usize,
}

/// Weighted quality score used only for bootstrap pair orientation.
pub fn quality_score(metrics: &Metrics) -> f32 {
    QUALITY_WEIGHTS
        .iter()
        .map(|(name, weight)| weight * metrics.get(name))
        .sum()
}

/// Ingest benchmark content for one platform, then generate labeled pairs
/// from the newly created items.
///
/// Items already present (matched by source reference) are skipped, as are
/// wrap-around self-pairs and pairs whose two sides score exactly equal.
pub fn bootstrap(
    store: &RankStore,
    source: &dyn BenchmarkSource,
    platform: Platform,
) -> anyhow::Result<BootstrapReport> {
    let samples = source.samples(platform)?;
    let mut report = BootstrapReport::default();

    let mut items = Vec::new();
    for sample in &samples {
        let source_ref = sample.source_ref();
        if store
            .find_item_by_source_ref(platform, &source_ref)?
            .is_some()
        {
            report.items_skipped += 1;
            continue;
        }
        let features = extract(&sample.text, &sample.section);
        let item = store.create_item(platform, &sample.section, &source_ref, features.into())?;
        items.push(item);
        report.items_created += 1;
    }

    // Wrap-around pairing over the new items in insertion order. Pair
    // creation happens strictly after both items are committed above.
    let n = items.len();
    if n >= 2 {
        for i in 0..n {
            let a = &items[i];
            let b = &items[(i + 1) % n];
            if a.id == b.id {
                continue;
            }
            let a_score = quality_score(&a.metrics);
            let b_score = quality_score(&b.metrics);
            if a_score == b_score {
                report.pairs_skipped += 1;
                continue;
            }
            // Orient the winner into slot A so the label is always 1.
            let (winner, loser, gap) = if a_score > b_score {
                (a, b, a_score - b_score)
            } else {
                (b, a, b_score - a_score)
            };
            store.create_pair(
                &winner.id,
                &loser.id,
                Label::APreferred,
                vec![format!("quality_gap:{gap:.2}")],
                PairSource::Benchmark,
            )?;
            report.pairs_created += 1;
        }
    }

    info!(
        platform = %platform,
        items = report.items_created,
        skipped_items = report.items_skipped,
        pairs = report.pairs_created,
        skipped_pairs = report.pairs_skipped,
        "bootstrap complete"
    );
    Ok(report)
}
