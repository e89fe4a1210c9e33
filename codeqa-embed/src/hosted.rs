//! Hosted feature-extraction endpoint (HuggingFace inference API)

use crate::Embedding;
use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::pooling::{mean_pool, normalize};
use crate::provider::EmbeddingProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Short model names accepted for the hosted endpoint, with their repositories.
const HOSTED_MODELS: &[(&str, &str)] = &[
    ("all-minilm-l6-v2", "sentence-transformers/all-MiniLM-L6-v2"),
    ("bge-small-en-v1.5", "BAAI/bge-small-en-v1.5"),
    ("bge-base-en-v1.5", "BAAI/bge-base-en-v1.5"),
    ("bge-large-en-v1.5", "BAAI/bge-large-en-v1.5"),
];

/// Resolve a configured model name to a repository id.
///
/// Names that already look like `owner/model` pass through unchanged.
pub fn hosted_model_repo(name: &str) -> Result<String> {
    if name.contains('/') {
        return Ok(name.to_string());
    }
    HOSTED_MODELS
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(name))
        .map(|(_, repo)| repo.to_string())
        .ok_or_else(|| EmbedError::UnknownModel {
            name: name.to_string(),
            supported: HOSTED_MODELS
                .iter()
                .map(|(short, _)| *short)
                .collect::<Vec<_>>()
                .join(", ")
                + ", or any owner/model repository id",
        })
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a str,
}

/// Everything the endpoint is known to answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FeatureExtractionResponse {
    /// Sentence-level vector, already pooled
    Pooled(Vec<f32>),
    /// One vector per token
    TokenLevel(Vec<Vec<f32>>),
    /// `{"error": "..."}`
    ApiError { error: String },
}

impl FeatureExtractionResponse {
    /// Reduce the response to a single normalized vector
    pub(crate) fn into_embedding(self) -> Result<Embedding> {
        let mut embedding = match self {
            Self::Pooled(vector) => vector,
            Self::TokenLevel(rows) => mean_pool(&rows)?,
            Self::ApiError { error } => {
                return Err(EmbedError::malformed(format!(
                    "endpoint returned an error: {error}"
                )));
            }
        };
        if embedding.is_empty() {
            return Err(EmbedError::malformed("empty embedding vector"));
        }
        if embedding.iter().any(|value| !value.is_finite()) {
            return Err(EmbedError::malformed("non-finite values in embedding"));
        }
        normalize(&mut embedding);
        Ok(embedding)
    }
}

/// Turn a raw feature-extraction reply into a normalized embedding.
///
/// Non-success statuses become [`EmbedError::Api`], carrying the endpoint's own
/// `{"error": ...}` message when it sent one.
pub fn parse_feature_extraction(status: u16, body: &str) -> Result<Embedding> {
    let parsed = serde_json::from_str::<FeatureExtractionResponse>(body);
    if !(200..300).contains(&status) {
        let message = match parsed {
            Ok(FeatureExtractionResponse::ApiError { error }) => error,
            _ => body.trim().chars().take(200).collect(),
        };
        return Err(EmbedError::Api { status, message });
    }
    parsed
        .map_err(|e| EmbedError::malformed(format!("unexpected feature-extraction payload: {e}")))?
        .into_embedding()
}

/// Embedding provider backed by a hosted feature-extraction endpoint.
///
/// One POST per text to `<endpoint>/<repo>/pipeline/feature-extraction`, with a
/// bearer token read from the configured environment variable at request time.
#[derive(Debug)]
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    url: String,
    api_token_env: String,
    dimension: OnceLock<usize>,
}

impl HuggingFaceProvider {
    pub fn new(config: &EmbedConfig) -> Result<Self> {
        let repo = hosted_model_repo(&config.model_name)?;
        let url = format!(
            "{}/{}/pipeline/feature-extraction",
            config.endpoint.trim_end_matches('/'),
            repo
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url,
            api_token_env: config.api_token_env.clone(),
            dimension: OnceLock::new(),
        })
    }

    /// The full request URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    async fn embed_text(&self, text: &str) -> Result<Embedding> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&FeatureExtractionRequest { inputs: text });
        match std::env::var(&self.api_token_env) {
            Ok(token) if !token.is_empty() => request = request.bearer_auth(token),
            _ => tracing::debug!("{} not set, sending unauthenticated request", self.api_token_env),
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let embedding = parse_feature_extraction(status, &body)?;

        let expected = *self.dimension.get_or_init(|| embedding.len());
        if embedding.len() != expected {
            return Err(EmbedError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension.get().copied().unwrap_or(0)
    }

    fn provider_name(&self) -> &str {
        "hugging-face"
    }
}
