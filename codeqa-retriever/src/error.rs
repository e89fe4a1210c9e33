//! Error types for retrieval and question answering

use crate::completion::CompletionError;
use crate::retrieval::ranker::RankingError;
use codeqa_context::ChunkerError;
use codeqa_embed::EmbedError;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Coarse category of a failure, for callers that only need to know which
/// stage went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The project could not be read, or had nothing to read
    Io,
    /// The embedding backend failed
    Embedding,
    /// Ranking inputs were unusable
    Ranking,
    /// The language model call failed
    Completion,
    /// Settings were invalid
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Project root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("No matching source files under {}", root.display())]
    NoMatchingFiles { root: PathBuf },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Chunking failed: {0}")]
    Chunking(#[from] ChunkerError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("Ranking failed: {0}")]
    Ranking(#[from] RankingError),

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RetrievalError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RootNotFound { .. }
            | Self::NoMatchingFiles { .. }
            | Self::Io { .. }
            | Self::Task(_) => ErrorKind::Io,
            Self::InvalidPattern { .. } | Self::Chunking(_) | Self::Config { .. } => {
                ErrorKind::Config
            }
            Self::Embedding(EmbedError::InvalidConfig { .. })
            | Self::Embedding(EmbedError::UnknownModel { .. }) => ErrorKind::Config,
            Self::Embedding(_) => ErrorKind::Embedding,
            Self::Ranking(_) => ErrorKind::Ranking,
            Self::Completion(CompletionError::NotConfigured { .. }) => ErrorKind::Config,
            Self::Completion(_) => ErrorKind::Completion,
        }
    }

    /// Short message suitable for an editor notification
    pub fn user_message(&self) -> String {
        match self {
            Self::RootNotFound { path } => {
                format!("Folder {} does not exist.", path.display())
            }
            Self::NoMatchingFiles { .. } => "No source files found in this project.".to_string(),
            Self::Io { path, .. } => format!("Could not read {}.", path.display()),
            Self::InvalidPattern { pattern, .. } => format!("Invalid file pattern: {pattern}"),
            Self::Completion(CompletionError::NotConfigured { message }) => {
                format!("No language model configured ({message}).")
            }
            other => match other.kind() {
                ErrorKind::Io => "Could not read the project.".to_string(),
                ErrorKind::Embedding => "Failed to embed the codebase.".to_string(),
                ErrorKind::Ranking => "Failed to rank code matches.".to_string(),
                ErrorKind::Completion => "The language model request failed.".to_string(),
                ErrorKind::Config => format!("Invalid configuration: {other}"),
            },
        }
    }
}
