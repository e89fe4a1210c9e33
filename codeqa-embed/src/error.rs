//! Errors raised while configuring providers or embedding text

/// Shorthand for results whose error is [`EmbedError`].
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Any of these aborts the whole batch it occurred in: the embedding client has
/// no partial-success contract, so callers never see a half-embedded corpus.
///
/// # Error Categories
///
/// - **Configuration Errors**: Invalid settings or an unknown model name
/// - **Initialization Errors**: Failures while loading the model
/// - **Runtime Errors**: A text failed to embed, or the backend answered with
///   something that is not an embedding
/// - **External Errors**: Failures from dependencies (HTTP, task joins)
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// A setting is out of range
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The configured model name is not one the provider knows
    #[error("Unknown embedding model '{name}'. Supported models: {supported}")]
    UnknownModel { name: String, supported: String },

    /// The model could not be downloaded or loaded
    #[error("Failed to initialize embedding model: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The model failed on a particular text
    #[error("Failed to embed text: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The hosted backend could not be reached or answered with an error status
    #[error("Embedding request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The hosted endpoint answered with a non-success status
    #[error("Embedding endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The backend answered, but not with a usable embedding
    #[error("Malformed embedding response: {reason}")]
    MalformedResponse { reason: String },

    /// An embedding had a different dimension from the rest of the batch
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A blocking inference task panicked or was cancelled
    #[error("Embedding task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl EmbedError {
    /// Wrap a model loading failure.
    pub fn model_init<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ModelInitialization {
            source: source.into(),
        }
    }

    /// Wrap an inference failure.
    pub fn embedding_gen<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::EmbeddingGeneration {
            source: source.into(),
        }
    }

    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}
