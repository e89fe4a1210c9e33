//! Embedding provider implementations
//!
//! A provider turns one piece of text into one mean-pooled, unit-normalized
//! vector. Providers are constructed once at startup and shared behind an
//! `Arc`; none of them keeps process-wide state.

use crate::Embedding;
use crate::config::{EmbedConfig, ProviderKind};
use crate::error::{EmbedError, Result};
use crate::hashing::HashingProvider;
use crate::hosted::HuggingFaceProvider;
use crate::pooling::normalize;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Embedding>;

    /// Get the dimension of embeddings produced by this provider.
    ///
    /// Zero when the dimension is only known after the first call.
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Local models known to fastembed, with their output dimension.
const FASTEMBED_MODELS: &[(&str, usize)] = &[
    ("all-minilm-l6-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
    ("bge-large-en-v1.5", 1024),
    ("nomic-embed-text-v1", 768),
    ("nomic-embed-text-v1.5", 768),
    ("multilingual-e5-small", 384),
    ("multilingual-e5-base", 768),
    ("multilingual-e5-large", 1024),
];

fn supported_fastembed_models() -> String {
    FASTEMBED_MODELS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a configured model name to a fastembed model and its dimension
pub fn fastembed_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    let model = match name.to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "nomic-embed-text-v1" => EmbeddingModel::NomicEmbedTextV1,
        "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
        "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
        "multilingual-e5-base" => EmbeddingModel::MultilingualE5Base,
        "multilingual-e5-large" => EmbeddingModel::MultilingualE5Large,
        _ => {
            return Err(EmbedError::UnknownModel {
                name: name.to_string(),
                supported: supported_fastembed_models(),
            });
        }
    };
    let dimension = FASTEMBED_MODELS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, dim)| *dim)
        .unwrap_or_default();
    Ok((model, dimension))
}

/// FastEmbed-based embedding provider using a local ONNX model.
///
/// The model is loaded on the first call to [`EmbeddingProvider::embed_text`]
/// and reused by every later call on the same provider.
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model_kind: EmbeddingModel,
    dimension: usize,
    model: OnceCell<Arc<Mutex<TextEmbedding>>>,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.config.model_name)
            .field("loaded", &self.model.initialized())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a provider without loading the model yet.
    ///
    /// Fails only if the configured model name is unknown.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        let (model_kind, dimension) = fastembed_model(&config.model_name)?;
        Ok(Self {
            config,
            model_kind,
            dimension,
            model: OnceCell::new(),
        })
    }

    /// Creates a provider and loads its model immediately
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let provider = Self::new(config)?;
        provider.model().await?;
        Ok(provider)
    }

    /// Whether the model has been loaded
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    async fn model(&self) -> Result<Arc<Mutex<TextEmbedding>>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                tracing::info!(
                    "Initializing FastEmbed provider for model: {}",
                    self.config.model_name
                );

                let mut init_options =
                    InitOptions::new(self.model_kind.clone()).with_show_download_progress(true);
                if let Some(cache_dir) = &self.config.cache_dir {
                    init_options = init_options.with_cache_dir(cache_dir.clone());
                }

                let model = tokio::task::spawn_blocking(move || {
                    TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)
                })
                .await??;

                tracing::info!("Model loaded successfully. Dimension: {}", self.dimension);
                Ok::<_, EmbedError>(Arc::new(Mutex::new(model)))
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Embedding> {
        let model = self.model().await?;
        let text = text.to_string();

        let mut embedding = tokio::task::spawn_blocking(move || -> Result<Embedding> {
            let mut model_guard = model
                .lock()
                .map_err(|_| EmbedError::embedding_gen("embedding model lock poisoned"))?;
            let embeddings = model_guard
                .embed(vec![text], None)
                .map_err(EmbedError::embedding_gen)?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| EmbedError::malformed("model returned no embedding"))
        })
        .await??;

        if self.dimension != 0 && embedding.len() != self.dimension {
            return Err(EmbedError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(EmbedError::malformed("non-finite values in embedding"));
        }

        normalize(&mut embedding);
        Ok(embedding)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

/// Create the provider selected by `config.provider`.
///
/// Nothing is downloaded or loaded here; local models load on first use.
pub fn create_provider(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate()?;
    tracing::debug!("Creating {} embedding provider", config.provider);

    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        ProviderKind::FastEmbed => Arc::new(FastEmbedProvider::new(config.clone())?),
        ProviderKind::HuggingFace => Arc::new(HuggingFaceProvider::new(config)?),
        ProviderKind::Hashing => Arc::new(HashingProvider::new(config.hashing_dimension)),
    };
    Ok(provider)
}
