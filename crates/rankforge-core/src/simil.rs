//! Cosine similarity over dense embedding vectors.
//!
//! Mismatched dimensions are a hard error on every operation — vectors are
//! never truncated or padded to fit.

use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("empty vector set")]
    Empty,
}

fn check_dims(a: &[f32], b: &[f32]) -> Result<(), SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Cosine similarity in [-1, 1]. Zero vectors compare as 0.
pub fn cosine(a: &[f32], b: &[f32]) -> Result<f32, SimilarityError> {
    check_dims(a, b)?;
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// The `k` entries of `vectors` most similar to `query`, as
/// `(original index, similarity)` sorted by similarity descending, ties
/// broken by index ascending.
pub fn top_k(
    query: &[f32],
    vectors: &[Vec<f32>],
    k: usize,
) -> Result<Vec<(usize, f32)>, SimilarityError> {
    let mut scored = Vec::with_capacity(vectors.len());
    for (i, v) in vectors.iter().enumerate() {
        scored.push((i, cosine(query, v)?));
    }
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(k);
    Ok(scored)
}

/// L2-normalize a vector in place.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Element-wise mean of a non-empty set of equal-length vectors.
pub fn average(vectors: &[Vec<f32>]) -> Result<Vec<f32>, SimilarityError> {
    let first = vectors.first().ok_or(SimilarityError::Empty)?;
    let mut sum = vec![0.0f32; first.len()];
    for v in vectors {
        check_dims(first, v)?;
        for (acc, &val) in sum.iter_mut().zip(v) {
            *acc += val;
        }
    }
    let n = vectors.len() as f32;
    for x in &mut sum {
        *x /= n;
    }
    Ok(sum)
}
