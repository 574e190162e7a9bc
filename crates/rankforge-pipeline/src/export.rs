//! Dataset export: JSONL pair rows plus a metadata contract file.
//!
//! The writer streams one line per pair so memory stays bounded by a single
//! row regardless of pair count. Pairs whose referenced item has been
//! purged are counted as skipped — reported, never silently dropped.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use rankforge_core::features::FEATURE_NAMES;
use rankforge_core::hash::dataset_hash;
use rankforge_core::types::Metrics;
use rankforge_store::{RankStore, StoreError};

pub const DATASET_FILE: &str = "dataset.jsonl";
pub const METADATA_FILE: &str = "metadata.json";

/// Config key recording the hash of the last exported dataset, so a
/// re-export can tell whether the pair set drifted since training.
pub const LAST_EXPORT_HASH_KEY: &str = "last_export_hash";

#[derive(Serialize)]
struct DatasetRow<'a> {
    a_metrics: &'a Metrics,
    b_metrics: &'a Metrics,
    a_embedding_id: Option<&'a str>,
    b_embedding_id: Option<&'a str>,
    label: i8,
    reason_tags: &'a [String],
    source: &'a str,
}

/// `metadata.json` — the contract consumed by the external trainer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub version: String,
    pub feature_names: Vec<String>,
    pub embedding_dim: usize,
    pub metrics_dim: usize,
    pub item_count: usize,
    pub pair_count: usize,
    pub skipped_pairs: usize,
    pub dataset_hash: String,
    pub created_at: String,
    pub label_distribution: BTreeMap<String, usize>,
}

/// Outcome of one export invocation.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub dataset_path: PathBuf,
    pub metadata_path: PathBuf,
    pub item_count: usize,
    pub pair_count: usize,
    pub skipped_pairs: usize,
    pub dataset_hash: String,
}

/// Export every valid pair to `out_dir/dataset.jsonl` and write the
/// accompanying `metadata.json`. `embedding_dim` is the dimensionality the
/// trainer should assume for (optional) embedding inputs.
pub fn export(
    store: &RankStore,
    out_dir: &Path,
    embedding_dim: usize,
) -> anyhow::Result<ExportReport> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating export directory {}", out_dir.display()))?;
    let dataset_path = out_dir.join(DATASET_FILE);
    let metadata_path = out_dir.join(METADATA_FILE);

    let pairs = store.all_pairs()?;
    let mut writer = BufWriter::new(
        File::create(&dataset_path)
            .with_context(|| format!("creating {}", dataset_path.display()))?,
    );

    let mut triples: Vec<(String, String, i8)> = Vec::with_capacity(pairs.len());
    let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
    for key in ["-1", "0", "1"] {
        distribution.insert(key.to_string(), 0);
    }
    let mut skipped_pairs = 0usize;

    for pair in &pairs {
        let a = match store.get_item(&pair.a_item_id) {
            Ok(item) => item,
            Err(StoreError::NotFound) => {
                skipped_pairs += 1;
                continue;
            }
            Err(e) => return Err(e).context("loading pair item A"),
        };
        let b = match store.get_item(&pair.b_item_id) {
            Ok(item) => item,
            Err(StoreError::NotFound) => {
                skipped_pairs += 1;
                continue;
            }
            Err(e) => return Err(e).context("loading pair item B"),
        };

        let row = DatasetRow {
            a_metrics: &a.metrics,
            b_metrics: &b.metrics,
            a_embedding_id: a.embedding_id.as_deref(),
            b_embedding_id: b.embedding_id.as_deref(),
            label: pair.label.value(),
            reason_tags: &pair.reason_tags,
            source: pair.source.as_str(),
        };
        serde_json::to_writer(&mut writer, &row).context("writing dataset row")?;
        writer.write_all(b"\n")?;

        *distribution
            .entry(pair.label.value().to_string())
            .or_default() += 1;
        triples.push((pair.a_item_id.clone(), pair.b_item_id.clone(), pair.label.value()));
    }
    writer.flush()?;

    let hash = dataset_hash(triples.iter().map(|(a, b, label)| (a.as_str(), b.as_str(), *label)));
    let pair_count = triples.len();
    let item_count = store.count_items(None)?;

    let metadata = DatasetMetadata {
        version: "1.0".to_string(),
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        embedding_dim,
        metrics_dim: FEATURE_NAMES.len(),
        item_count,
        pair_count,
        skipped_pairs,
        dataset_hash: hash.clone(),
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        label_distribution: distribution,
    };
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
        .with_context(|| format!("writing {}", metadata_path.display()))?;

    store.set_config(LAST_EXPORT_HASH_KEY, &hash)?;

    info!(
        pairs = pair_count,
        skipped = skipped_pairs,
        hash = %hash,
        "exported dataset"
    );
    Ok(ExportReport {
        dataset_path,
        metadata_path,
        item_count,
        pair_count,
        skipped_pairs,
        dataset_hash: hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankforge_core::features::feature;
    use rankforge_core::types::{Label, PairSource, Platform, RankItem};
    use serde_json::Value;

    fn metrics(clarity: f32) -> Metrics {
        let mut m = Metrics::new();
        m.set(feature::CLARITY, clarity).unwrap();
        m
    }

    fn seed_items(store: &RankStore, n: usize) -> Vec<RankItem> {
        (0..n)
            .map(|i| {
                store
                    .create_item(
                        Platform::Linkedin,
                        "summary",
                        &format!("ref-{i}"),
                        metrics(0.1 * i as f32),
                    )
                    .unwrap()
            })
            .collect()
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn export_counts_valid_and_skipped_pairs() {
        let store = RankStore::open().unwrap();
        let items = seed_items(&store, 5);
        store
            .create_pair(&items[0].id, &items[1].id, Label::APreferred, vec![], PairSource::Benchmark)
            .unwrap();
        store
            .create_pair(&items[1].id, &items[2].id, Label::BPreferred, vec![], PairSource::UserChoice)
            .unwrap();
        store
            .create_pair(&items[2].id, &items[3].id, Label::Equal, vec![], PairSource::Benchmark)
            .unwrap();
        store
            .create_pair(&items[3].id, &items[4].id, Label::APreferred, vec![], PairSource::Benchmark)
            .unwrap();

        // Orphan one pair by deleting its item without the cascade helper.
        store
            .execute(&format!(
                "DELETE FROM rank_items WHERE id = '{}'",
                items[4].id
            ))
            .unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let report = export(&store, tmp.path(), 384).unwrap();

        assert_eq!(report.pair_count, 3);
        assert_eq!(report.skipped_pairs, 1);
        assert_eq!(report.item_count, 4);
        assert_eq!(read_lines(&report.dataset_path).len(), 3);
    }

    #[test]
    fn dataset_rows_carry_contract_fields() {
        let store = RankStore::open().unwrap();
        let items = seed_items(&store, 2);
        store.set_item_embedding(&items[0].id, "emb-a").unwrap();
        store
            .create_pair(
                &items[0].id,
                &items[1].id,
                Label::APreferred,
                vec!["clearer".to_string()],
                PairSource::UserChoice,
            )
            .unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let report = export(&store, tmp.path(), 128).unwrap();
        let rows = read_lines(&report.dataset_path);
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row["label"], 1);
        assert_eq!(row["source"], "user_choice");
        assert_eq!(row["a_embedding_id"], "emb-a");
        assert!(row["b_embedding_id"].is_null());
        assert_eq!(row["reason_tags"][0], "clearer");
        assert!((row["a_metrics"]["clarity"].as_f64().unwrap() - 0.0).abs() < 1e-6);
    }

    #[test]
    fn metadata_matches_export() {
        let store = RankStore::open().unwrap();
        let items = seed_items(&store, 3);
        store
            .create_pair(&items[0].id, &items[1].id, Label::APreferred, vec![], PairSource::Benchmark)
            .unwrap();
        store
            .create_pair(&items[1].id, &items[2].id, Label::BPreferred, vec![], PairSource::Benchmark)
            .unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let report = export(&store, tmp.path(), 384).unwrap();

        let meta: Value =
            serde_json::from_str(&std::fs::read_to_string(&report.metadata_path).unwrap()).unwrap();
        assert_eq!(meta["version"], "1.0");
        assert_eq!(meta["embeddingDim"], 384);
        assert_eq!(meta["metricsDim"], FEATURE_NAMES.len());
        assert_eq!(meta["itemCount"], 3);
        assert_eq!(meta["pairCount"], 2);
        assert_eq!(meta["skippedPairs"], 0);
        assert_eq!(meta["datasetHash"], report.dataset_hash.as_str());
        assert_eq!(meta["labelDistribution"]["1"], 1);
        assert_eq!(meta["labelDistribution"]["-1"], 1);
        assert_eq!(meta["labelDistribution"]["0"], 0);
        assert_eq!(
            meta["featureNames"].as_array().unwrap().len(),
            FEATURE_NAMES.len()
        );
    }

    #[test]
    fn hash_ignores_metric_recomputation() {
        let store = RankStore::open().unwrap();
        let items = seed_items(&store, 2);
        store
            .create_pair(&items[0].id, &items[1].id, Label::APreferred, vec![], PairSource::Benchmark)
            .unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let first = export(&store, tmp.path(), 384).unwrap();

        // Simulate metric recomputation: rewrite stored metric values.
        store
            .execute(&format!(
                r#"UPDATE rank_items SET metrics = '{{"clarity":0.99}}' WHERE id = '{}'"#,
                items[0].id
            ))
            .unwrap();

        let second = export(&store, tmp.path(), 384).unwrap();
        assert_eq!(first.dataset_hash, second.dataset_hash);
    }

    #[test]
    fn hash_changes_when_labels_change() {
        let store = RankStore::open().unwrap();
        let items = seed_items(&store, 2);
        store
            .create_pair(&items[0].id, &items[1].id, Label::APreferred, vec![], PairSource::Benchmark)
            .unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let first = export(&store, tmp.path(), 384).unwrap();

        store.execute("UPDATE rank_pairs SET label = -1").unwrap();
        let second = export(&store, tmp.path(), 384).unwrap();
        assert_ne!(first.dataset_hash, second.dataset_hash);
    }

    #[test]
    fn last_export_hash_recorded_in_config() {
        let store = RankStore::open().unwrap();
        let items = seed_items(&store, 2);
        store
            .create_pair(&items[0].id, &items[1].id, Label::APreferred, vec![], PairSource::Benchmark)
            .unwrap();

        let tmp = tempfile::TempDir::new().unwrap();
        let report = export(&store, tmp.path(), 384).unwrap();
        assert_eq!(
            store.get_config(LAST_EXPORT_HASH_KEY).unwrap().as_deref(),
            Some(report.dataset_hash.as_str())
        );
    }

    #[test]
    fn empty_store_exports_empty_dataset() {
        let store = RankStore::open().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        let report = export(&store, tmp.path(), 384).unwrap();
        assert_eq!(report.pair_count, 0);
        assert_eq!(report.skipped_pairs, 0);
        assert!(read_lines(&report.dataset_path).is_empty());
    }
}
