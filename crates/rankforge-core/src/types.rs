//! Domain types shared across the workspace.
//!
//! `RankItem`, `RankPair`, and `RankRun` are immutable once created (the one
//! exception is the item's embedding back-reference). File-facing structs
//! (`ActiveModel`, `ModelMetadata`) carry the camelCase field names of the
//! on-disk JSON contracts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{FEATURE_NAMES, FeatureVector};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown pair source: {0}")]
    UnknownSource(String),

    #[error("invalid label {0}, expected -1, 0 or 1")]
    InvalidLabel(i64),

    #[error("unknown feature name: {0}")]
    UnknownFeature(String),
}

/// Platform a scoreable item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    Github,
    Resume,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Github => "github",
            Self::Resume => "resume",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linkedin" => Ok(Self::Linkedin),
            "github" => Ok(Self::Github),
            "resume" => Ok(Self::Resume),
            other => Err(DomainError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Where a labeled pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairSource {
    Benchmark,
    UserChoice,
    BeforeAfter,
    Heuristic,
}

impl PairSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benchmark => "benchmark",
            Self::UserChoice => "user_choice",
            Self::BeforeAfter => "before_after",
            Self::Heuristic => "heuristic",
        }
    }
}

impl fmt::Display for PairSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PairSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "benchmark" => Ok(Self::Benchmark),
            "user_choice" => Ok(Self::UserChoice),
            "before_after" => Ok(Self::BeforeAfter),
            "heuristic" => Ok(Self::Heuristic),
            other => Err(DomainError::UnknownSource(other.to_string())),
        }
    }
}

/// Preference label: which side of a pair is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// B preferred (-1).
    BPreferred,
    /// No preference (0).
    Equal,
    /// A preferred (1).
    APreferred,
}

impl Label {
    pub fn value(self) -> i8 {
        match self {
            Self::BPreferred => -1,
            Self::Equal => 0,
            Self::APreferred => 1,
        }
    }

    pub fn try_from_i64(value: i64) -> Result<Self, DomainError> {
        match value {
            -1 => Ok(Self::BPreferred),
            0 => Ok(Self::Equal),
            1 => Ok(Self::APreferred),
            other => Err(DomainError::InvalidLabel(other)),
        }
    }
}

/// Named feature values for one item.
///
/// Keys are constrained to the canonical [`FEATURE_NAMES`] vocabulary at
/// write time; reads default missing keys to 0.0 rather than storing nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, f32>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw map, rejecting keys outside the canonical vocabulary.
    pub fn try_from_map(map: BTreeMap<String, f32>) -> Result<Self, DomainError> {
        for key in map.keys() {
            if !FEATURE_NAMES.contains(&key.as_str()) {
                return Err(DomainError::UnknownFeature(key.clone()));
            }
        }
        Ok(Self(map))
    }

    /// Set one feature value. The name must be canonical.
    pub fn set(&mut self, name: &str, value: f32) -> Result<(), DomainError> {
        if !FEATURE_NAMES.contains(&name) {
            return Err(DomainError::UnknownFeature(name.to_string()));
        }
        self.0.insert(name.to_string(), value);
        Ok(())
    }

    /// Read one feature value; missing keys read as 0.0.
    pub fn get(&self, name: &str) -> f32 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    /// Values in canonical [`FEATURE_NAMES`] order, missing keys as 0.0.
    pub fn ordered(&self) -> [f32; FEATURE_NAMES.len()] {
        let mut out = [0.0; FEATURE_NAMES.len()];
        for (slot, name) in out.iter_mut().zip(FEATURE_NAMES) {
            *slot = self.get(name);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<FeatureVector> for Metrics {
    fn from(fv: FeatureVector) -> Self {
        let map = FEATURE_NAMES
            .iter()
            .zip(fv.ordered())
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Self(map)
    }
}

/// One scoreable text unit with precomputed features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankItem {
    pub id: String,
    pub platform: Platform,
    /// Free-form section tag, e.g. "headline", "readme".
    pub section: String,
    /// Identifies or contains the source text; may be truncated.
    pub source_ref: String,
    /// Weak back-reference into the embedding cache.
    pub embedding_id: Option<String>,
    pub metrics: Metrics,
    pub created_at: DateTime<Utc>,
}

/// One labeled preference between two items.
#[derive(Debug, Clone, PartialEq)]
pub struct RankPair {
    pub id: String,
    pub a_item_id: String,
    pub b_item_id: String,
    pub label: Label,
    pub reason_tags: Vec<String>,
    pub source: PairSource,
    pub created_at: DateTime<Utc>,
}

/// Record of one completed external training run.
#[derive(Debug, Clone, PartialEq)]
pub struct RankRun {
    pub id: String,
    pub model_path: String,
    pub metadata_path: String,
    pub dataset_hash: String,
    pub train_metrics: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

/// Durable pointer to the currently active model, stored as
/// `active_model.json` in the models directory. The trainer writes a
/// `model` key; we accept both spellings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveModel {
    #[serde(rename = "activeModel", alias = "model")]
    pub active_model: String,
    pub metadata: String,
    #[serde(
        rename = "activatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub activated_at: Option<String>,
}

/// Metadata file written by the external trainer next to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub version: String,
    pub embedding_dim: usize,
    pub metrics_dim: usize,
    pub feature_names: Vec<String>,
    pub dataset_hash: String,
    #[serde(default)]
    pub train_metrics: BTreeMap<String, f64>,
    pub created_at: String,
    #[serde(default)]
    pub onnx_op_set: Option<u32>,
}
