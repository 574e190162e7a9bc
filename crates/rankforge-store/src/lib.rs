//! Durable storage for the ranking dataset: items, labeled pairs,
//! training runs, and a small key-value config table.

mod error;
pub use error::StoreError;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{LabelDistribution, RankStore};
