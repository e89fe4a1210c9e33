//! Pooling and normalization of raw model output

use crate::Embedding;
use crate::error::{EmbedError, Result};

/// Average token-level rows into a single vector.
///
/// All rows must share one dimension. An empty matrix is rejected, since
/// there is nothing meaningful to average.
pub fn mean_pool(rows: &[Vec<f32>]) -> Result<Embedding> {
    let first = rows
        .first()
        .ok_or_else(|| EmbedError::malformed("cannot pool an empty token matrix"))?;
    let dimension = first.len();

    let mut pooled = vec![0.0f32; dimension];
    for row in rows {
        if row.len() != dimension {
            return Err(EmbedError::DimensionMismatch {
                expected: dimension,
                actual: row.len(),
            });
        }
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
    }

    let count = rows.len() as f32;
    for value in &mut pooled {
        *value /= count;
    }
    Ok(pooled)
}

/// Scale a vector to unit length in place.
///
/// All-zero vectors are left unchanged.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Euclidean length of a vector.
pub fn magnitude(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}
