//! Bounded-concurrency embedding client

use crate::Embedding;
use crate::cache::EmbeddingCache;
use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, create_provider};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Embeds batches of text through a single provider.
///
/// Every text is a separate provider call. At most `max_concurrency` calls are
/// in flight at once; the rest wait for a permit. Results come back in input
/// order, and the first failure fails the whole batch.
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    permits: Semaphore,
    max_concurrency: usize,
    cache: Option<Arc<EmbeddingCache>>,
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("provider", &self.provider.provider_name())
            .field("max_concurrency", &self.max_concurrency)
            .field("cache", &self.cache.as_ref().map(|cache| cache.len()))
            .finish()
    }
}

impl EmbeddingClient {
    /// Create a client around an already constructed provider
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(EmbedError::invalid_config(
                "max_concurrency must be at least 1",
            ));
        }
        Ok(Self {
            provider,
            permits: Semaphore::new(max_concurrency),
            max_concurrency,
            cache: None,
        })
    }

    /// Build the configured provider and wrap it in a client
    pub fn from_config(config: &EmbedConfig) -> Result<Self> {
        let provider = create_provider(config)?;
        let client = Self::new(provider, config.max_concurrency)?;
        if config.cache_embeddings {
            Ok(client.with_cache(Arc::new(EmbeddingCache::new())))
        } else {
            Ok(client)
        }
    }

    /// Reuse embeddings from `cache` instead of calling the provider again
    pub fn with_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn cache(&self) -> Option<&Arc<EmbeddingCache>> {
        self.cache.as_ref()
    }

    /// Embed every text, returning vectors co-indexed with `texts`
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(
            "Embedding {} texts with {} (max {} in flight)",
            texts.len(),
            self.provider.provider_name(),
            self.max_concurrency
        );

        let embeddings = try_join_all(texts.iter().map(|text| self.embed_one(text))).await?;

        let expected = embeddings[0].len();
        if let Some(odd) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(EmbedError::DimensionMismatch {
                expected,
                actual: odd.len(),
            });
        }

        tracing::debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    /// Embed a single text under the concurrency limit
    pub async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let provider_name = self.provider.provider_name();
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(provider_name, text) {
                return Ok(hit.as_ref().clone());
            }
        }

        let embedding = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(EmbedError::embedding_gen)?;
            self.provider.embed_text(text).await?
        };

        if let Some(cache) = &self.cache {
            cache.insert(provider_name, text, Arc::new(embedding.clone()));
        }
        Ok(embedding)
    }
}
