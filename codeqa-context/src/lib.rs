//! # codeqa-context
//!
//! Structure-aware chunking of source files for codebase question answering.
//!
//! Files are split line by line into bounded-length chunks that tend to start and
//! end at declarations (`function`, `class`, `fn`, `def`, ...). Each chunk is small
//! enough to embed on its own, and the chunks of a file always join back into the
//! original text.
//!
//! See [`text`] for the algorithm and its guarantees.

pub mod text;

// Re-export the main chunking API for external use
pub use text::{
    Chunk, ChunkerError, CodeChunker, DEFAULT_MAX_CHUNK_LENGTH, boundary_pattern_for_path,
    chunk_code, create_chunker_for_path,
};
