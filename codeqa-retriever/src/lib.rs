//! codeqa-retriever: answer questions about a codebase from its own source
//!
//! Given a project directory and a question, this crate finds the chunks of
//! source code most similar to the question and hands them, with the question,
//! to a language model.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: File loading, similarity ranking and the orchestrator
//! - **[`completion`]**: The language model boundary
//! - **[`config`]**: `.codeqa.toml` loading and validation
//! - **[`error`]**: Error types and their user-facing categories
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codeqa_embed::{EmbedConfig, EmbeddingClient};
//! use codeqa_retriever::completion::{ChatCompletionClient, CompletionConfig};
//! use codeqa_retriever::retrieval::{CodebaseQa, RetrievalSettings};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let embedder = Arc::new(EmbeddingClient::from_config(&EmbedConfig::default())?);
//! let llm = Arc::new(ChatCompletionClient::new(CompletionConfig::default())?);
//! let qa = CodebaseQa::new(embedder, Some(llm), RetrievalSettings::default());
//!
//! let answer = qa
//!     .answer_from_codebase("Where is the config parsed?", Path::new("."), None)
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Files → Loader → Chunker → EmbeddingClient → Ranker → Prompt → CompletionProvider
//!                                   ↑
//!                          question embedding
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod retrieval;

pub use error::{ErrorKind, Result, RetrievalError};
