//! `.codeqa.toml` configuration
//!
//! ```toml
//! [loader]
//! include = ["**/*.rs", "**/*.ts"]
//! exclude = ["**/target/**"]
//!
//! [chunking]
//! max_chunk_length = 800
//!
//! [retrieval]
//! top_k = 5
//!
//! [embedding]
//! provider = "fastembed"
//! model_name = "all-minilm-l6-v2"
//! max_concurrency = 5
//!
//! [completion]
//! model = "llama3-70b-8192"
//! api_key_env = "GROQ_API_KEY"
//! ```
//!
//! Every table and key is optional.

use crate::completion::CompletionConfig;
use crate::error::{Result, RetrievalError};
use crate::retrieval::loader::LoaderConfig;
use crate::retrieval::orchestrator::RetrievalSettings;
use crate::retrieval::ranker::DEFAULT_TOP_K;
use codeqa_context::DEFAULT_MAX_CHUNK_LENGTH;
use codeqa_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked for in the project root when no config path is given
pub const CONFIG_FILE_NAME: &str = ".codeqa.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSection {
    pub max_chunk_length: usize,
    /// Regex overriding the per-extension boundary pattern
    pub boundary_pattern: Option<String>,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        Self {
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            boundary_pattern: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    pub top_k: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeQaConfig {
    pub loader: LoaderConfig,
    pub chunking: ChunkingSection,
    pub retrieval: RetrievalSection,
    pub embedding: EmbedConfig,
    pub completion: CompletionConfig,
}

impl CodeQaConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RetrievalError::config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RetrievalError::io(path, e))?;
        tracing::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// The explicit `path` if given, else `<project_root>/.codeqa.toml` if it
    /// exists, else defaults.
    pub fn discover(path: Option<&Path>, project_root: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let candidate: PathBuf = project_root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, project_root.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chunk_length == 0 {
            return Err(RetrievalError::config("chunking.max_chunk_length must be > 0"));
        }
        if self.retrieval.top_k == 0 {
            return Err(RetrievalError::config("retrieval.top_k must be >= 1"));
        }
        if self.embedding.max_concurrency == 0 {
            return Err(RetrievalError::config("embedding.max_concurrency must be >= 1"));
        }
        if self.loader.include.is_empty() {
            return Err(RetrievalError::config("loader.include must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(RetrievalError::config(
                "completion.temperature must be in [0.0, 2.0]",
            ));
        }
        Ok(())
    }

    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            loader: self.loader.clone(),
            max_chunk_length: self.chunking.max_chunk_length,
            boundary_pattern: self.chunking.boundary_pattern.clone(),
            top_k: self.retrieval.top_k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeqa_embed::ProviderKind;
    use tempfile::tempdir;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = CodeQaConfig::from_toml_str("").unwrap();

        assert_eq!(config, CodeQaConfig::default());
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.chunking.max_chunk_length, 1000);
        assert_eq!(config.embedding.max_concurrency, 5);
        assert_eq!(config.completion.model, "llama3-70b-8192");
    }

    #[test]
    fn test_partial_sections() {
        let config = CodeQaConfig::from_toml_str(
            r#"
            [loader]
            include = ["**/*.rs"]

            [retrieval]
            top_k = 7

            [embedding]
            provider = "hashing"
            cache_embeddings = true
            "#,
        )
        .unwrap();

        assert_eq!(config.loader.include, vec!["**/*.rs".to_string()]);
        assert!(config.loader.respect_gitignore);
        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.embedding.provider, ProviderKind::Hashing);
        assert!(config.embedding.cache_embeddings);

        let settings = config.retrieval_settings();
        assert_eq!(settings.top_k, 7);
        assert_eq!(settings.max_chunk_length, 1000);
    }

    #[test]
    fn test_validation_errors() {
        for doc in [
            "[chunking]\nmax_chunk_length = 0",
            "[retrieval]\ntop_k = 0",
            "[embedding]\nmax_concurrency = 0",
            "[loader]\ninclude = []",
            "[completion]\ntemperature = 5.0",
        ] {
            let err = CodeQaConfig::from_toml_str(doc).unwrap_err();
            assert!(matches!(err, RetrievalError::Config { .. }), "doc: {doc}");
        }
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = CodeQaConfig::from_toml_str("[retrieval\ntop_k = ").unwrap_err();
        assert!(matches!(err, RetrievalError::Config { .. }));
    }

    #[test]
    fn test_discover() {
        let dir = tempdir().unwrap();

        let config = CodeQaConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config, CodeQaConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[retrieval]\ntop_k = 2\n").unwrap();
        let config = CodeQaConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 2);

        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[retrieval]\ntop_k = 9\n").unwrap();
        let config = CodeQaConfig::discover(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 9);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            CodeQaConfig::discover(Some(&missing), dir.path()),
            Err(RetrievalError::Io { .. })
        ));
    }
}
