//! Configuration for embedding providers and the embedding client

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model used when no model name is configured.
pub const DEFAULT_MODEL_NAME: &str = "all-minilm-l6-v2";

/// Default number of embedding requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Default dimension of vectors produced by the hashing provider.
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Default base URL of the hosted feature-extraction endpoint.
/// The model name is appended as `<endpoint>/<model>/pipeline/feature-extraction`.
pub const DEFAULT_HF_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";

/// Environment variable holding the hosted endpoint's API token.
pub const DEFAULT_HF_TOKEN_ENV: &str = "HF_TOKEN";

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Local ONNX model through fastembed
    #[default]
    #[serde(alias = "local")]
    FastEmbed,
    /// Hosted HuggingFace feature-extraction endpoint
    #[serde(alias = "hf")]
    HuggingFace,
    /// Offline character-trigram feature hashing
    Hashing,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::FastEmbed => "fastembed",
            ProviderKind::HuggingFace => "hugging-face",
            ProviderKind::Hashing => "hashing",
        };
        f.write_str(name)
    }
}

/// Configuration for embedding generation.
///
/// Deserializes from the `[embedding]` table of a config file with every field
/// optional, and can be built in code with the `with_*` methods:
///
/// ```
/// use codeqa_embed::{EmbedConfig, ProviderKind};
///
/// let config = EmbedConfig::default()
///     .with_provider(ProviderKind::Hashing)
///     .with_max_concurrency(8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Backend used to embed text
    pub provider: ProviderKind,
    /// Name of the embedding model to use
    pub model_name: String,
    /// Where local model files are cached (fastembed's default when unset)
    pub cache_dir: Option<PathBuf>,
    /// Maximum number of embedding requests in flight at once
    pub max_concurrency: usize,
    /// Keep embeddings in memory keyed by content hash
    pub cache_embeddings: bool,
    /// Output dimension of the hashing provider
    pub hashing_dimension: usize,
    /// Base URL of the hosted endpoint
    pub endpoint: String,
    /// Environment variable holding the hosted endpoint's token
    pub api_token_env: String,
    /// Request timeout for the hosted endpoint
    pub timeout_secs: u64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            cache_embeddings: false,
            hashing_dimension: DEFAULT_HASHING_DIMENSION,
            endpoint: DEFAULT_HF_ENDPOINT.to_string(),
            api_token_env: DEFAULT_HF_TOKEN_ENV.to_string(),
            timeout_secs: 30,
        }
    }
}

impl EmbedConfig {
    /// Create a configuration for the given model with default settings
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Offline configuration that needs neither network nor model files
    pub fn hashing() -> Self {
        Self::default().with_provider(ProviderKind::Hashing)
    }

    /// Set the provider (builder style)
    pub fn with_provider(self, provider: ProviderKind) -> Self {
        Self { provider, ..self }
    }

    /// Set the model name (builder style)
    pub fn with_model_name(self, model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..self
        }
    }

    /// Set the local model cache directory (builder style)
    pub fn with_cache_dir(self, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(cache_dir.into()),
            ..self
        }
    }

    /// Set the concurrency limit (builder style)
    pub fn with_max_concurrency(self, max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            ..self
        }
    }

    /// Enable or disable the in-memory embedding cache (builder style)
    pub fn with_cache_embeddings(self, cache_embeddings: bool) -> Self {
        Self {
            cache_embeddings,
            ..self
        }
    }

    /// Set the hashing provider's dimension (builder style)
    pub fn with_hashing_dimension(self, hashing_dimension: usize) -> Self {
        Self {
            hashing_dimension,
            ..self
        }
    }

    /// Set the hosted endpoint base URL (builder style)
    pub fn with_endpoint(self, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..self
        }
    }

    /// Set the environment variable read for the hosted token (builder style)
    pub fn with_api_token_env(self, api_token_env: impl Into<String>) -> Self {
        Self {
            api_token_env: api_token_env.into(),
            ..self
        }
    }

    /// Set the hosted request timeout (builder style)
    pub fn with_timeout_secs(self, timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..self
        }
    }

    /// Reject settings no provider can work with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(EmbedError::invalid_config(
                "max_concurrency must be at least 1",
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model_name must not be empty"));
        }
        if self.provider == ProviderKind::Hashing && self.hashing_dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hashing_dimension must be at least 1",
            ));
        }
        if self.provider == ProviderKind::HuggingFace {
            if self.endpoint.trim().is_empty() {
                return Err(EmbedError::invalid_config("endpoint must not be empty"));
            }
            if self.timeout_secs == 0 {
                return Err(EmbedError::invalid_config(
                    "timeout_secs must be at least 1",
                ));
            }
        }

        tracing::debug!(
            "Embedding config validated: provider={}, model={}",
            self.provider,
            self.model_name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmbedConfig::default();

        assert_eq!(config.provider, ProviderKind::FastEmbed);
        assert_eq!(config.model_name, "all-minilm-l6-v2");
        assert_eq!(config.max_concurrency, 5);
        assert!(!config.cache_embeddings);
        assert!(config.cache_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = EmbedConfig::new("bge-small-en-v1.5")
            .with_provider(ProviderKind::HuggingFace)
            .with_cache_dir("/tmp/models")
            .with_max_concurrency(2)
            .with_cache_embeddings(true)
            .with_endpoint("http://localhost:9000")
            .with_api_token_env("MY_TOKEN")
            .with_timeout_secs(5);

        assert_eq!(config.model_name, "bge-small-en-v1.5");
        assert_eq!(config.provider, ProviderKind::HuggingFace);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/models")));
        assert_eq!(config.max_concurrency, 2);
        assert!(config.cache_embeddings);
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.api_token_env, "MY_TOKEN");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = EmbedConfig::hashing()
            .with_max_concurrency(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, EmbedError::InvalidConfig { .. }));
    }

    #[test]
    fn test_zero_hashing_dimension_rejected() {
        let config = EmbedConfig::hashing().with_hashing_dimension(0);
        assert!(config.validate().is_err());

        // Only matters when the hashing provider is selected
        let config = EmbedConfig::default().with_hashing_dimension(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_table() {
        let config: EmbedConfig = serde_json::from_str(
            r#"{ "provider": "hashing", "max_concurrency": 3, "cache_embeddings": true }"#,
        )
        .unwrap();

        assert_eq!(config.provider, ProviderKind::Hashing);
        assert_eq!(config.max_concurrency, 3);
        assert!(config.cache_embeddings);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
        assert_eq!(config.hashing_dimension, DEFAULT_HASHING_DIMENSION);
    }

    #[test]
    fn test_provider_aliases() {
        let local: ProviderKind = serde_json::from_str(r#""local""#).unwrap();
        let hf: ProviderKind = serde_json::from_str(r#""hf""#).unwrap();
        let full: ProviderKind = serde_json::from_str(r#""hugging-face""#).unwrap();

        assert_eq!(local, ProviderKind::FastEmbed);
        assert_eq!(hf, ProviderKind::HuggingFace);
        assert_eq!(full, ProviderKind::HuggingFace);
        assert_eq!(ProviderKind::Hashing.to_string(), "hashing");
    }
}
