//! This module splits source files into line-aligned chunks that are small enough
//! to embed independently, for use in codebase question answering.
//!
//! The chunker walks a file line by line and accumulates lines into a buffer.
//! A chunk is closed when either:
//!
//! *   the buffer reaches the configured maximum length (measured in characters of
//!     the newline-joined buffer, not bytes or tokens), or
//! *   the line just added looks like a *structural boundary*, i.e. it starts a
//!     declaration such as `function`, `class`, `const`, `fn` or `def`.
//!
//! The effect is that chunks tend to line up with logical code units rather than
//! cutting through the middle of a statement.
//!
//! # Guarantees
//!
//! *   **Lines are never split.** A single line longer than the maximum becomes its
//!     own oversized chunk instead of being truncated.
//! *   **Bounded length.** Apart from that single-line case, no chunk is longer
//!     than the maximum: if appending a line would overflow the buffer, the buffer
//!     is closed first.
//! *   **Completeness.** Joining the chunks of a file with `"\n"` reconstructs the
//!     file content exactly.
//! *   **Determinism.** The same text and maximum always produce the same chunks.
//!
//! # Example
//!
//! ```
//! use codeqa_context::text::chunk_code;
//!
//! let source = "import fs from 'fs';\nconst root = '.';\nfunction main() {\n  return root;\n}";
//! let chunks = chunk_code(source, 1000);
//!
//! // `const` and `function` lines each close a chunk.
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[0], "import fs from 'fs';\nconst root = '.';");
//! assert_eq!(chunks.join("\n"), source);
//! ```
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 1000;

/// Boundary pattern for source code.
///
/// Matches a line that begins (after indentation) with a declaration keyword,
/// optionally preceded by `export` and/or an `async` qualifier:
///
/// - `function`, `class`, `interface` (JavaScript / TypeScript)
/// - `const`, `let`, `var` (variable bindings)
/// - `def` (Python)
/// - `fn`, `pub fn`, `struct`, `impl` (Rust)
pub const CODE_BOUNDARY_PATTERN: &str = r"^\s*(?:export\s+)?(?:async\s+)?(?:function|class|interface|const|let|var|def|fn|pub\s+fn|struct|impl)\b";

/// Boundary pattern for Markdown and plain text: any heading line.
pub const MARKDOWN_BOUNDARY_PATTERN: &str = r"^\s*#{1,6}\s+";

static CODE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(CODE_BOUNDARY_PATTERN).expect("built-in code boundary pattern is valid")
});

static MARKDOWN_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(MARKDOWN_BOUNDARY_PATTERN).expect("built-in markdown boundary pattern is valid")
});

/// Errors raised while configuring a [`CodeChunker`].
#[derive(Debug, thiserror::Error)]
pub enum ChunkerError {
    /// The custom boundary pattern is not a valid regular expression
    #[error("Invalid boundary pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A maximum chunk length of zero would make every chunk oversized
    #[error("Maximum chunk length must be greater than zero")]
    ZeroMaxLength,
}

/// Result type for chunker configuration.
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// A contiguous slice of one file's text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Path of the file this chunk came from, relative to the project root.
    pub source_path: String,
    /// Position of this chunk within its file (0-indexed).
    pub sequence: usize,
    /// The chunk text, without a trailing newline.
    pub text: String,
}

impl Chunk {
    /// Length of the chunk text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns `true` if the chunk contains nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Splits text into line-aligned, bounded-length chunks.
///
/// `CodeChunker` pairs a maximum chunk length with a boundary regex. Use
/// [`CodeChunker::new`] for source code, or [`create_chunker_for_path`] to pick
/// a boundary pattern based on a file's extension.
#[derive(Debug, Clone)]
pub struct CodeChunker {
    boundary: Regex,
    max_length: usize,
}

impl CodeChunker {
    /// Creates a chunker that uses [`CODE_BOUNDARY_PATTERN`].
    ///
    /// # Errors
    ///
    /// Returns [`ChunkerError::ZeroMaxLength`] if `max_length` is zero.
    pub fn new(max_length: usize) -> Result<Self> {
        if max_length == 0 {
            return Err(ChunkerError::ZeroMaxLength);
        }
        Ok(Self {
            boundary: CODE_BOUNDARY.clone(),
            max_length,
        })
    }

    /// Creates a chunker with a custom boundary pattern.
    ///
    /// The pattern is matched against each line on its own, so `^` anchors to the
    /// start of the line.
    ///
    /// # Examples
    ///
    /// ```
    /// use codeqa_context::text::CodeChunker;
    ///
    /// let chunker = CodeChunker::with_boundary_pattern(500, r"^\s*SECTION\b").unwrap();
    /// let chunks = chunker.chunk("intro\nSECTION one\nbody\nSECTION two");
    /// assert_eq!(chunks, vec!["intro\nSECTION one", "body\nSECTION two"]);
    /// ```
    pub fn with_boundary_pattern(max_length: usize, pattern: &str) -> Result<Self> {
        if max_length == 0 {
            return Err(ChunkerError::ZeroMaxLength);
        }
        let boundary = Regex::new(pattern).map_err(|source| ChunkerError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            boundary,
            max_length,
        })
    }

    /// The maximum chunk length in characters.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns `true` if `line` starts a new logical unit.
    pub fn is_boundary(&self, line: &str) -> bool {
        self.boundary.is_match(line)
    }

    /// Splits `text` into chunk strings.
    ///
    /// Empty input produces no chunks. See the module documentation for the
    /// closing rules and guarantees.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        if text.is_empty() {
            return chunks;
        }

        let mut buffer: Vec<&str> = Vec::new();
        // Character length of `buffer.join("\n")`, tracked incrementally.
        let mut buffered_chars = 0usize;

        for line in text.split('\n') {
            let line_chars = line.chars().count();

            // Close the buffer early rather than let a multi-line chunk overflow.
            if !buffer.is_empty() && buffered_chars + 1 + line_chars > self.max_length {
                chunks.push(buffer.join("\n"));
                buffer.clear();
                buffered_chars = 0;
            }

            if !buffer.is_empty() {
                buffered_chars += 1;
            }
            buffered_chars += line_chars;
            buffer.push(line);

            if buffered_chars >= self.max_length || self.is_boundary(line) {
                chunks.push(buffer.join("\n"));
                buffer.clear();
                buffered_chars = 0;
            }
        }

        if !buffer.is_empty() {
            chunks.push(buffer.join("\n"));
        }

        chunks
    }

    /// Splits a file's content into [`Chunk`]s tagged with `source_path`.
    pub fn chunk_file(&self, source_path: &str, content: &str) -> Vec<Chunk> {
        self.chunk(content)
            .into_iter()
            .enumerate()
            .map(|(sequence, text)| Chunk {
                source_path: source_path.to_string(),
                sequence,
                text,
            })
            .collect()
    }
}

/// Splits source code into chunks using the default code boundary pattern.
///
/// This is the plain-function form of [`CodeChunker::chunk`]. A `max_length` of
/// zero closes a chunk after every line.
pub fn chunk_code(text: &str, max_length: usize) -> Vec<String> {
    CodeChunker {
        boundary: CODE_BOUNDARY.clone(),
        max_length,
    }
    .chunk(text)
}

/// Get the boundary pattern that suits a file, based on its extension.
///
/// Markdown and text files (and `README`/`CHANGELOG` files without an extension)
/// split on headings; everything else is treated as code.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use codeqa_context::text::{boundary_pattern_for_path, CODE_BOUNDARY_PATTERN, MARKDOWN_BOUNDARY_PATTERN};
///
/// assert_eq!(boundary_pattern_for_path(Path::new("src/app.ts")), CODE_BOUNDARY_PATTERN);
/// assert_eq!(boundary_pattern_for_path(Path::new("docs/guide.md")), MARKDOWN_BOUNDARY_PATTERN);
/// ```
pub fn boundary_pattern_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("md") | Some("markdown") | Some("txt") => MARKDOWN_BOUNDARY_PATTERN,
        Some(_) => CODE_BOUNDARY_PATTERN,
        None => {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if filename.starts_with("README") || filename.starts_with("CHANGELOG") {
                    return MARKDOWN_BOUNDARY_PATTERN;
                }
            }
            CODE_BOUNDARY_PATTERN
        }
    }
}

/// Create a [`CodeChunker`] pre-configured for the given file path.
///
/// Picks the boundary pattern with [`boundary_pattern_for_path`] and falls back
/// to [`DEFAULT_MAX_CHUNK_LENGTH`] when `max_length` is `None`.
///
/// # Errors
///
/// Returns [`ChunkerError::ZeroMaxLength`] if `max_length` is `Some(0)`.
pub fn create_chunker_for_path(path: &Path, max_length: Option<usize>) -> Result<CodeChunker> {
    let max_length = max_length.unwrap_or(DEFAULT_MAX_CHUNK_LENGTH);
    if max_length == 0 {
        return Err(ChunkerError::ZeroMaxLength);
    }
    let boundary = if boundary_pattern_for_path(path) == MARKDOWN_BOUNDARY_PATTERN {
        MARKDOWN_BOUNDARY.clone()
    } else {
        CODE_BOUNDARY.clone()
    };
    Ok(CodeChunker {
        boundary,
        max_length,
    })
}
