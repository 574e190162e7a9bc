//! DuckDB storage for rank items, labeled pairs, and training runs.
//!
//! Referential integrity note: DuckDB has no `ON DELETE CASCADE`, so the
//! conceptual cascade between `rank_pairs` and `rank_items` is enforced
//! here — pair inserts validate both referenced items exist, and
//! [`RankStore::delete_item`] removes dependent pairs in the same
//! transaction. Label and self-pair CHECK constraints stay declared in the
//! schema as the in-engine backstop.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
// Arrow types come from duckdb's re-export so result batches and our
// downcasts always agree on the arrow version.
use duckdb::arrow::array::{
    Array, Int8Array, Int32Array, Int64Array, LargeStringArray, StringArray,
};
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::{Connection, params};
use tracing::info;
use uuid::Uuid;

use rankforge_core::types::{
    Label, Metrics, PairSource, Platform, RankItem, RankPair, RankRun,
};

use crate::StoreError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rank_items (
    id VARCHAR PRIMARY KEY,
    platform VARCHAR NOT NULL,
    section VARCHAR NOT NULL,
    source_ref VARCHAR NOT NULL,
    embedding_id VARCHAR,
    metrics VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS rank_pairs (
    id VARCHAR PRIMARY KEY,
    a_item_id VARCHAR NOT NULL,
    b_item_id VARCHAR NOT NULL,
    label INTEGER NOT NULL CHECK (label IN (-1, 0, 1)),
    reason_tags VARCHAR NOT NULL,
    source VARCHAR NOT NULL
        CHECK (source IN ('benchmark', 'user_choice', 'before_after', 'heuristic')),
    created_at VARCHAR NOT NULL,
    CHECK (a_item_id <> b_item_id)
);
CREATE TABLE IF NOT EXISTS rank_runs (
    id VARCHAR PRIMARY KEY,
    model_path VARCHAR NOT NULL,
    metadata_path VARCHAR NOT NULL,
    dataset_hash VARCHAR NOT NULL,
    train_metrics VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL
);
CREATE TABLE IF NOT EXISTS config (
    key VARCHAR PRIMARY KEY,
    value VARCHAR NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_items_platform ON rank_items (platform, section);
CREATE INDEX IF NOT EXISTS idx_items_source_ref ON rank_items (source_ref);
CREATE INDEX IF NOT EXISTS idx_pairs_source ON rank_pairs (source);
CREATE INDEX IF NOT EXISTS idx_pairs_label ON rank_pairs (label);
CREATE INDEX IF NOT EXISTS idx_pairs_created ON rank_pairs (created_at);
CREATE INDEX IF NOT EXISTS idx_runs_created ON rank_runs (created_at);
";

const ITEM_COLUMNS: &str =
    "id, platform, section, source_ref, embedding_id, metrics, created_at";
const PAIR_COLUMNS: &str =
    "id, a_item_id, b_item_id, label, reason_tags, source, created_at";
const RUN_COLUMNS: &str =
    "id, model_path, metadata_path, dataset_hash, train_metrics, created_at";

/// Grouped pair counts per label value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelDistribution {
    pub b_preferred: usize,
    pub equal: usize,
    pub a_preferred: usize,
}

impl LabelDistribution {
    pub fn total(&self) -> usize {
        self.b_preferred + self.equal + self.a_preferred
    }
}

/// DuckDB store for the ranking dataset.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
pub struct RankStore {
    conn: Connection,
}

impl RankStore {
    /// Open an in-memory store with the schema applied.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open or create a persistent store at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ── Items ──

    /// Create one immutable item. The id is generated here.
    pub fn create_item(
        &self,
        platform: Platform,
        section: &str,
        source_ref: &str,
        metrics: Metrics,
    ) -> Result<RankItem, StoreError> {
        let item = RankItem {
            id: Uuid::new_v4().to_string(),
            platform,
            section: section.to_string(),
            source_ref: source_ref.to_string(),
            embedding_id: None,
            metrics,
            created_at: Utc::now().trunc_subsecs(6),
        };
        self.conn.execute(
            "INSERT INTO rank_items (id, platform, section, source_ref, embedding_id, metrics, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                item.id,
                item.platform.as_str(),
                item.section,
                item.source_ref,
                item.embedding_id,
                serde_json::to_string(&item.metrics)?,
                timestamp(item.created_at),
            ],
        )?;
        Ok(item)
    }

    /// Fetch one item by id.
    pub fn get_item(&self, id: &str) -> Result<RankItem, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM rank_items WHERE id = ?");
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([id])?.collect();
        first_row(&batches)
            .map(|(batch, row)| item_from_batch(batch, row))
            .ok_or(StoreError::NotFound)?
    }

    /// Find an item by its source reference, used for bootstrap dedup.
    pub fn find_item_by_source_ref(
        &self,
        platform: Platform,
        source_ref: &str,
    ) -> Result<Option<RankItem>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM rank_items WHERE platform = ? AND source_ref = ?"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> =
            stmt.query_arrow([platform.as_str(), source_ref])?.collect();
        first_row(&batches)
            .map(|(batch, row)| item_from_batch(batch, row))
            .transpose()
    }

    /// Set the embedding back-reference — the only permitted item mutation.
    pub fn set_item_embedding(&self, id: &str, embedding_id: &str) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE rank_items SET embedding_id = ? WHERE id = ?",
            params![embedding_id, id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// List items in creation order, capped at `limit`.
    pub fn list_items(&self, limit: usize) -> Result<Vec<RankItem>, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM rank_items ORDER BY created_at, id LIMIT {limit}"
        );
        let batches = self.query_arrow(&sql)?;
        collect_rows(&batches, item_from_batch)
    }

    /// Count items, optionally filtered by platform.
    pub fn count_items(&self, platform: Option<Platform>) -> Result<usize, StoreError> {
        match platform {
            None => self.count_query("SELECT count(*) FROM rank_items", []),
            Some(p) => self.count_query(
                "SELECT count(*) FROM rank_items WHERE platform = ?",
                [p.as_str()],
            ),
        }
    }

    /// Administrative purge: delete an item and cascade to every pair that
    /// references it. Returns the number of pairs removed.
    pub fn delete_item(&self, id: &str) -> Result<usize, StoreError> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| {
            let pairs = self.conn.execute(
                "DELETE FROM rank_pairs WHERE a_item_id = ? OR b_item_id = ?",
                params![id, id],
            )?;
            let items = self
                .conn
                .execute("DELETE FROM rank_items WHERE id = ?", params![id])?;
            if items == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(pairs)
        })();
        match result {
            Ok(pairs) => {
                self.conn.execute_batch("COMMIT")?;
                info!(item = id, cascaded_pairs = pairs, "purged rank item");
                Ok(pairs)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    // ── Pairs ──

    /// Create one labeled pair. Rejects self-pairs and references to
    /// missing items with [`StoreError::Validation`] before any write.
    pub fn create_pair(
        &self,
        a_item_id: &str,
        b_item_id: &str,
        label: Label,
        reason_tags: Vec<String>,
        source: PairSource,
    ) -> Result<RankPair, StoreError> {
        if a_item_id == b_item_id {
            return Err(StoreError::Validation(format!(
                "pair references the same item on both sides: {a_item_id}"
            )));
        }
        for id in [a_item_id, b_item_id] {
            if !self.item_exists(id)? {
                return Err(StoreError::Validation(format!(
                    "referenced item does not exist: {id}"
                )));
            }
        }

        let pair = RankPair {
            id: Uuid::new_v4().to_string(),
            a_item_id: a_item_id.to_string(),
            b_item_id: b_item_id.to_string(),
            label,
            reason_tags,
            source,
            created_at: Utc::now().trunc_subsecs(6),
        };
        self.conn.execute(
            "INSERT INTO rank_pairs (id, a_item_id, b_item_id, label, reason_tags, source, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                pair.id,
                pair.a_item_id,
                pair.b_item_id,
                i32::from(pair.label.value()),
                serde_json::to_string(&pair.reason_tags)?,
                pair.source.as_str(),
                timestamp(pair.created_at),
            ],
        )?;
        Ok(pair)
    }

    /// List pairs in creation order, capped at `limit`.
    pub fn list_pairs(&self, limit: usize) -> Result<Vec<RankPair>, StoreError> {
        let sql = format!(
            "SELECT {PAIR_COLUMNS} FROM rank_pairs ORDER BY created_at, id LIMIT {limit}"
        );
        let batches = self.query_arrow(&sql)?;
        collect_rows(&batches, pair_from_batch)
    }

    /// Every pair in stable creation order. Export relies on this ordering
    /// for a reproducible dataset hash.
    pub fn all_pairs(&self) -> Result<Vec<RankPair>, StoreError> {
        let sql = format!("SELECT {PAIR_COLUMNS} FROM rank_pairs ORDER BY created_at, id");
        let batches = self.query_arrow(&sql)?;
        collect_rows(&batches, pair_from_batch)
    }

    /// Count pairs, optionally filtered by source.
    pub fn count_pairs(&self, source: Option<PairSource>) -> Result<usize, StoreError> {
        match source {
            None => self.count_query("SELECT count(*) FROM rank_pairs", []),
            Some(s) => self.count_query(
                "SELECT count(*) FROM rank_pairs WHERE source = ?",
                [s.as_str()],
            ),
        }
    }

    /// Grouped pair counts per label value, optionally filtered by source.
    pub fn label_distribution(
        &self,
        source: Option<PairSource>,
    ) -> Result<LabelDistribution, StoreError> {
        let batches: Vec<RecordBatch> = match source {
            None => {
                self.query_arrow("SELECT label, count(*) FROM rank_pairs GROUP BY label")?
            }
            Some(s) => {
                let mut stmt = self.conn.prepare(
                    "SELECT label, count(*) FROM rank_pairs WHERE source = ? GROUP BY label",
                )?;
                stmt.query_arrow([s.as_str()])?.collect()
            }
        };

        let mut dist = LabelDistribution::default();
        for batch in &batches {
            for row in 0..batch.num_rows() {
                let label = get_int(batch.column(0).as_ref(), row)
                    .ok_or_else(|| StoreError::Other("null label".into()))?;
                let count = get_int(batch.column(1).as_ref(), row).unwrap_or(0) as usize;
                match label {
                    -1 => dist.b_preferred = count,
                    0 => dist.equal = count,
                    1 => dist.a_preferred = count,
                    other => {
                        return Err(StoreError::Other(format!(
                            "unexpected label value in store: {other}"
                        )));
                    }
                }
            }
        }
        Ok(dist)
    }

    // ── Runs ──

    /// Record one completed training run.
    pub fn create_run(
        &self,
        model_path: &str,
        metadata_path: &str,
        dataset_hash: &str,
        train_metrics: BTreeMap<String, f64>,
    ) -> Result<RankRun, StoreError> {
        let run = RankRun {
            id: Uuid::new_v4().to_string(),
            model_path: model_path.to_string(),
            metadata_path: metadata_path.to_string(),
            dataset_hash: dataset_hash.to_string(),
            train_metrics,
            created_at: Utc::now().trunc_subsecs(6),
        };
        self.conn.execute(
            "INSERT INTO rank_runs (id, model_path, metadata_path, dataset_hash, train_metrics, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                run.id,
                run.model_path,
                run.metadata_path,
                run.dataset_hash,
                serde_json::to_string(&run.train_metrics)?,
                timestamp(run.created_at),
            ],
        )?;
        Ok(run)
    }

    /// The most recently created run, if any.
    pub fn latest_run(&self) -> Result<Option<RankRun>, StoreError> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM rank_runs ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let batches = self.query_arrow(&sql)?;
        first_row(&batches)
            .map(|(batch, row)| run_from_batch(batch, row))
            .transpose()
    }

    /// List runs newest-first, capped at `limit`.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<RankRun>, StoreError> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM rank_runs ORDER BY created_at DESC, id DESC LIMIT {limit}"
        );
        let batches = self.query_arrow(&sql)?;
        collect_rows(&batches, run_from_batch)
    }

    // ── Config ──

    /// Upsert one config value.
    pub fn set_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read one config value.
    pub fn get_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM config WHERE key = ?")?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([key])?.collect();
        Ok(first_row(&batches)
            .and_then(|(batch, row)| get_string(batch.column(0).as_ref(), row)))
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }

    /// Execute an arbitrary statement, returning the affected row count.
    pub fn execute(&self, sql: &str) -> Result<usize, StoreError> {
        Ok(self.conn.execute(sql, [])?)
    }

    // ── Internal ──

    fn item_exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.count_query("SELECT count(*) FROM rank_items WHERE id = ?", [id])? > 0)
    }

    fn count_query<P: duckdb::Params>(&self, sql: &str, params: P) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow(params)?.collect();
        let (batch, row) = first_row(&batches).ok_or(StoreError::NotFound)?;
        get_int(batch.column(0).as_ref(), row)
            .map(|n| n as usize)
            .ok_or_else(|| StoreError::Other("count column not an integer".into()))
    }
}

// ── Row mapping ──

fn first_row(batches: &[RecordBatch]) -> Option<(&RecordBatch, usize)> {
    batches.iter().find(|b| b.num_rows() > 0).map(|b| (b, 0))
}

fn collect_rows<T>(
    batches: &[RecordBatch],
    f: impl Fn(&RecordBatch, usize) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for batch in batches {
        for row in 0..batch.num_rows() {
            out.push(f(batch, row)?);
        }
    }
    Ok(out)
}

fn item_from_batch(batch: &RecordBatch, row: usize) -> Result<RankItem, StoreError> {
    Ok(RankItem {
        id: require_string(batch, 0, row)?,
        platform: require_string(batch, 1, row)?
            .parse::<Platform>()
            .map_err(|e| StoreError::Other(e.to_string()))?,
        section: require_string(batch, 2, row)?,
        source_ref: require_string(batch, 3, row)?,
        embedding_id: get_string(batch.column(4).as_ref(), row),
        metrics: serde_json::from_str(&require_string(batch, 5, row)?)?,
        created_at: parse_timestamp(&require_string(batch, 6, row)?)?,
    })
}

fn pair_from_batch(batch: &RecordBatch, row: usize) -> Result<RankPair, StoreError> {
    let label = get_int(batch.column(3).as_ref(), row)
        .ok_or_else(|| StoreError::Other("null label".into()))?;
    Ok(RankPair {
        id: require_string(batch, 0, row)?,
        a_item_id: require_string(batch, 1, row)?,
        b_item_id: require_string(batch, 2, row)?,
        label: Label::try_from_i64(label).map_err(|e| StoreError::Other(e.to_string()))?,
        reason_tags: serde_json::from_str(&require_string(batch, 4, row)?)?,
        source: require_string(batch, 5, row)?
            .parse::<PairSource>()
            .map_err(|e| StoreError::Other(e.to_string()))?,
        created_at: parse_timestamp(&require_string(batch, 6, row)?)?,
    })
}

fn run_from_batch(batch: &RecordBatch, row: usize) -> Result<RankRun, StoreError> {
    Ok(RankRun {
        id: require_string(batch, 0, row)?,
        model_path: require_string(batch, 1, row)?,
        metadata_path: require_string(batch, 2, row)?,
        dataset_hash: require_string(batch, 3, row)?,
        train_metrics: serde_json::from_str(&require_string(batch, 4, row)?)?,
        created_at: parse_timestamp(&require_string(batch, 5, row)?)?,
    })
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Other(format!("bad timestamp {s:?}: {e}")))
}

fn require_string(batch: &RecordBatch, col: usize, row: usize) -> Result<String, StoreError> {
    get_string(batch.column(col).as_ref(), row)
        .ok_or_else(|| StoreError::Other(format!("null value in column {col}")))
}

fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

fn get_int(col: &dyn Array, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<Int64Array>() {
        return Some(arr.value(row));
    }
    if let Some(arr) = any.downcast_ref::<Int32Array>() {
        return Some(i64::from(arr.value(row)));
    }
    any.downcast_ref::<Int8Array>()
        .map(|arr| i64::from(arr.value(row)))
}
