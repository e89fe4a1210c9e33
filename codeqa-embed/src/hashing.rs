//! Offline embeddings from hashed character trigrams

use crate::Embedding;
use crate::error::{EmbedError, Result};
use crate::pooling::normalize;
use crate::provider::EmbeddingProvider;
use async_trait::async_trait;
use fnv::FnvHasher;
use std::hash::Hasher;

/// Deterministic embedding provider that needs no model and no network.
///
/// Text is lowercased, every run of non-alphanumeric characters collapses to a
/// single space, and each character trigram of the padded result is hashed
/// with FNV into one of `dimension` buckets. The bucket counts are averaged
/// and normalized, so texts sharing many trigrams (`authenticate` and
/// `authentication`) land close together.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Embed synchronously; the async trait method delegates here.
    pub fn embed_sync(&self, text: &str) -> Result<Embedding> {
        if self.dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hashing dimension must be at least 1",
            ));
        }

        let chars = Self::normalize_text(text);
        let mut vector = vec![0.0f32; self.dimension];
        if chars.len() < 3 {
            // Too short to form a trigram: the zero vector has no direction.
            return Ok(vector);
        }

        let windows = chars.windows(3);
        let count = windows.len() as f32;
        for trigram in windows {
            let mut hasher = FnvHasher::default();
            for ch in trigram {
                hasher.write_u32(*ch as u32);
            }
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        for value in &mut vector {
            *value /= count;
        }
        normalize(&mut vector);
        Ok(vector)
    }

    fn normalize_text(text: &str) -> Vec<char> {
        let mut chars = vec![' '];
        for ch in text.chars().flat_map(char::to_lowercase) {
            if ch.is_alphanumeric() {
                chars.push(ch);
            } else if chars.last() != Some(&' ') {
                chars.push(' ');
            }
        }
        if chars.last() != Some(&' ') {
            chars.push(' ');
        }
        if chars.len() == 1 {
            chars.clear();
        }
        chars
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed_text(&self, text: &str) -> Result<Embedding> {
        self.embed_sync(text)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pooling::magnitude;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_dimension_and_unit_length() {
        let provider = HashingProvider::new(64);
        let embedding = provider.embed_text("fn main() {}").await.unwrap();

        assert_eq!(embedding.len(), 64);
        assert_eq!(provider.embedding_dimension(), 64);
        assert!((magnitude(&embedding) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let provider = HashingProvider::new(128);
        let a = provider.embed_sync("export class Parser {}").unwrap();
        let b = provider.embed_sync("export class Parser {}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let provider = HashingProvider::new(128);
        let a = provider.embed_sync("parse_config(path)").unwrap();
        let b = provider.embed_sync("PARSE config PATH").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_stems_score_higher() {
        let provider = HashingProvider::new(384);
        let query = provider.embed_sync("how does authentication work?").unwrap();
        let auth = provider
            .embed_sync("function authenticateUser(user, password) {}")
            .unwrap();
        let button = provider
            .embed_sync("function renderButton(label) {}")
            .unwrap();

        assert!(dot(&query, &auth) > dot(&query, &button));
    }

    #[test]
    fn test_blank_text_yields_zero_vector() {
        let provider = HashingProvider::new(16);
        assert_eq!(provider.embed_sync("").unwrap(), vec![0.0; 16]);
        assert_eq!(provider.embed_sync("  \n\t ").unwrap(), vec![0.0; 16]);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let provider = HashingProvider::new(0);
        assert!(matches!(
            provider.embed_sync("text"),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }
}
