//! # codeqa-embed
//!
//! Text embeddings for code retrieval. A single [`EmbeddingProvider`] turns one
//! text into one mean-pooled, unit-normalized vector; an [`EmbeddingClient`]
//! fans a batch of texts out over that provider under a concurrency limit and
//! returns the vectors in input order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use codeqa_embed::{EmbedConfig, EmbeddingClient};
//!
//! # async fn example() -> codeqa_embed::Result<()> {
//! // Local all-MiniLM-L6-v2 model, loaded on first use
//! let client = EmbeddingClient::from_config(&EmbedConfig::default())?;
//!
//! let texts = vec!["fn main() {}".to_string(), "class Parser {}".to_string()];
//! let embeddings = client.embed(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          embeddings.len(), embeddings[0].len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - [`FastEmbedProvider`]: local ONNX models through fastembed
//! - [`HuggingFaceProvider`]: hosted feature-extraction endpoint
//! - [`HashingProvider`]: offline character-trigram hashing, no model needed
//!
//! [`create_provider`] picks one from an [`EmbedConfig`].
//!
//! ## Architecture
//!
//! - [`config`]: Provider selection and client settings
//! - [`provider`]: The provider trait and the local fastembed provider
//! - [`hosted`]: The hosted endpoint provider and its response schema
//! - [`hashing`]: The offline provider
//! - [`pooling`]: Mean pooling and normalization shared by providers
//! - [`client`]: Concurrency-limited batch embedding
//! - [`cache`]: Optional in-memory cache keyed by content hash
//! - [`error`]: Error types and result handling

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod hashing;
pub mod hosted;
pub mod pooling;
pub mod provider;

/// A dense embedding vector.
pub type Embedding = Vec<f32>;

// Re-export main types for easy access
pub use cache::{CacheStats, DEFAULT_CACHE_MAX_ENTRIES, EmbeddingCache};
pub use client::EmbeddingClient;
pub use config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_MODEL_NAME, EmbedConfig, ProviderKind};
pub use error::{EmbedError, Result};
pub use hashing::HashingProvider;
pub use hosted::HuggingFaceProvider;
pub use provider::{EmbeddingProvider, FastEmbedProvider, create_provider};
