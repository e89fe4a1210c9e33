//! Cosine-similarity ranking of chunks against a query

use codeqa_context::Chunk;
use codeqa_embed::Embedding;
use serde::Serialize;
use std::cmp::Ordering;

/// Number of matches returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 3;

/// A chunk selected as context, with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub score: f32,
    pub source_path: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("no candidates to rank")]
    EmptyCandidates,

    #[error("candidate {index} has dimension {actual}, query has {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Cosine of the angle between `a` and `b`.
///
/// NaN when either vector has zero magnitude, or when the lengths differ.
/// Otherwise clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::NAN;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return f32::NAN;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

/// Descending by score, NaN after every number.
fn by_score_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Return the `top_k` candidates most similar to `query`, best first.
///
/// Ties keep their input order. Output length is `min(top_k, candidates.len())`.
pub fn rank(
    candidates: &[(Embedding, Chunk)],
    query: &[f32],
    top_k: usize,
) -> Result<Vec<Match>, RankingError> {
    if top_k == 0 {
        return Err(RankingError::InvalidTopK);
    }
    if candidates.is_empty() {
        return Err(RankingError::EmptyCandidates);
    }
    if let Some((index, (embedding, _))) = candidates
        .iter()
        .enumerate()
        .find(|(_, (embedding, _))| embedding.len() != query.len())
    {
        return Err(RankingError::DimensionMismatch {
            index,
            expected: query.len(),
            actual: embedding.len(),
        });
    }

    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(index, (embedding, _))| (index, cosine_similarity(query, embedding)))
        .collect();
    scored.sort_by(|(_, a), (_, b)| by_score_desc(*a, *b));

    let matches = scored
        .into_iter()
        .take(top_k)
        .map(|(index, score)| {
            let chunk = &candidates[index].1;
            Match {
                score,
                source_path: chunk.source_path.clone(),
                text: chunk.text.clone(),
            }
        })
        .collect();
    Ok(matches)
}
