//! The retrieval pipeline: file loading, similarity ranking and the
//! orchestrator that ties them to chunking, embedding and completion.

pub mod loader;
pub mod orchestrator;
pub mod ranker;

pub use loader::{LoaderConfig, SourceFile, load_source_files, load_source_files_with};
pub use orchestrator::{
    Answer, CodebaseQa, ProjectChunks, RetrievalSettings, RetrievedContext, assemble_prompt,
};
pub use ranker::{DEFAULT_TOP_K, Match, RankingError, cosine_similarity, rank};
