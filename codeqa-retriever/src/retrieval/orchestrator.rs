//! Question answering over a project: load, chunk, embed, rank, assemble, ask.

use crate::completion::{CompletionError, CompletionProvider};
use crate::error::{Result, RetrievalError};
use crate::retrieval::loader::{LoaderConfig, SourceFile, load_source_files_with};
use crate::retrieval::ranker::{DEFAULT_TOP_K, Match, rank};
use codeqa_context::{Chunk, CodeChunker, DEFAULT_MAX_CHUNK_LENGTH, create_chunker_for_path};
use codeqa_embed::{Embedding, EmbeddingClient};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Knobs for one retrieval pass
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    pub loader: LoaderConfig,
    /// Maximum chunk length in characters
    pub max_chunk_length: usize,
    /// Replaces the per-extension boundary pattern when set
    pub boundary_pattern: Option<String>,
    /// Matches kept when a call does not ask for a specific number
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            boundary_pattern: None,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Everything gathered for one question before the language model is asked
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedContext {
    pub question: String,
    pub matches: Vec<Match>,
    pub prompt: String,
    pub files_scanned: usize,
    pub chunks_embedded: usize,
}

/// A completed answer along with the context it was based on
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub context: RetrievedContext,
    pub text: String,
}

/// Files and chunks of one project, before embedding
#[derive(Debug, Clone)]
pub struct ProjectChunks {
    pub files: Vec<SourceFile>,
    pub chunks: Vec<Chunk>,
}

/// Build the prompt sent to the language model.
///
/// Each match becomes `// <path>\n<text>`; matches are separated by a blank
/// line and followed by the question.
pub fn assemble_prompt(question: &str, matches: &[Match]) -> String {
    let context = matches
        .iter()
        .map(|m| format!("// {}\n{}", m.source_path, m.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{context}\n\nQ: {question}\nA:")
}

/// Answers questions about a codebase.
///
/// Holds the embedding client and completion provider for its whole lifetime.
/// Each call re-reads the project; nothing is persisted between calls apart
/// from the embedding client's optional in-memory cache.
pub struct CodebaseQa {
    embedder: Arc<EmbeddingClient>,
    completion: Option<Arc<dyn CompletionProvider>>,
    settings: RetrievalSettings,
}

impl CodebaseQa {
    pub fn new(
        embedder: Arc<EmbeddingClient>,
        completion: Option<Arc<dyn CompletionProvider>>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            completion,
            settings,
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<EmbeddingClient> {
        &self.embedder
    }

    /// The chunker shared by every file, when a boundary pattern is configured
    fn custom_chunker(&self) -> Result<Option<CodeChunker>> {
        let Some(pattern) = &self.settings.boundary_pattern else {
            return Ok(None);
        };
        Ok(Some(CodeChunker::with_boundary_pattern(
            self.settings.max_chunk_length,
            pattern,
        )?))
    }

    /// Load and chunk every matching file under `project_root`.
    ///
    /// Whitespace-only chunks are dropped. Fails with
    /// [`RetrievalError::NoMatchingFiles`] when nothing is left to search.
    pub async fn load_chunks(&self, project_root: &Path) -> Result<ProjectChunks> {
        let custom = self.custom_chunker()?;
        let files = load_source_files_with(project_root, &self.settings.loader).await?;
        tracing::info!("Loaded {} source files from {}", files.len(), project_root.display());
        if files.is_empty() {
            return Err(RetrievalError::NoMatchingFiles {
                root: project_root.to_path_buf(),
            });
        }

        let mut chunks = Vec::new();
        for file in &files {
            let per_file;
            let chunker = match &custom {
                Some(chunker) => chunker,
                None => {
                    per_file = create_chunker_for_path(
                        Path::new(&file.path),
                        Some(self.settings.max_chunk_length),
                    )?;
                    &per_file
                }
            };
            chunks.extend(
                chunker
                    .chunk_file(&file.path, &file.content)
                    .into_iter()
                    .filter(|chunk| !chunk.is_blank()),
            );
        }
        tracing::info!("Split {} files into {} chunks", files.len(), chunks.len());
        if chunks.is_empty() {
            return Err(RetrievalError::NoMatchingFiles {
                root: project_root.to_path_buf(),
            });
        }

        Ok(ProjectChunks { files, chunks })
    }

    /// Find the `top_k` chunks most relevant to `question` and build the prompt.
    ///
    /// `None` falls back to [`RetrievalSettings::top_k`].
    pub async fn retrieve_context(
        &self,
        question: &str,
        project_root: &Path,
        top_k: Option<usize>,
    ) -> Result<RetrievedContext> {
        let started = Instant::now();
        let top_k = top_k.unwrap_or(self.settings.top_k);
        let ProjectChunks { files, chunks } = self.load_chunks(project_root).await?;

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        tracing::info!(
            "Embedded {} chunks with {}",
            embeddings.len(),
            self.embedder.provider().provider_name()
        );

        let query = self.embedder.embed_one(question).await?;
        let candidates: Vec<(Embedding, Chunk)> = embeddings.into_iter().zip(chunks).collect();
        let matches = rank(&candidates, &query, top_k)?;
        tracing::info!(
            "Ranked {} candidates, kept {} (top score {:.3})",
            candidates.len(),
            matches.len(),
            matches.first().map(|m| m.score).unwrap_or(f32::NAN)
        );

        let prompt = assemble_prompt(question, &matches);
        tracing::debug!(
            "Assembled {} char prompt in {:?}",
            prompt.chars().count(),
            started.elapsed()
        );

        Ok(RetrievedContext {
            question: question.to_string(),
            matches,
            prompt,
            files_scanned: files.len(),
            chunks_embedded: candidates.len(),
        })
    }

    /// Send already retrieved context to the language model
    pub async fn complete(&self, context: RetrievedContext) -> Result<Answer> {
        let provider = self
            .completion
            .as_ref()
            .ok_or_else(|| CompletionError::NotConfigured {
                message: "no completion provider was supplied".to_string(),
            })?;

        tracing::info!("Requesting completion for {} matches", context.matches.len());
        let text = provider.complete(&context.prompt).await?;
        Ok(Answer { context, text })
    }

    /// Retrieve context for `question` and ask the language model about it
    pub async fn answer(
        &self,
        question: &str,
        project_root: &Path,
        top_k: Option<usize>,
    ) -> Result<Answer> {
        let context = self.retrieve_context(question, project_root, top_k).await?;
        self.complete(context).await
    }

    /// The language model's answer, verbatim
    pub async fn answer_from_codebase(
        &self,
        question: &str,
        project_root: &Path,
        top_k: Option<usize>,
    ) -> Result<String> {
        Ok(self.answer(question, project_root, top_k).await?.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use codeqa_embed::{EmbedConfig, EmbedError, EmbeddingProvider};
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    /// Records the prompt it was given and replies with a fixed answer
    #[derive(Default)]
    struct RecordingCompletion {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingCompletion {
        async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("  It checks the password.\n".to_string())
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionProvider for FailingCompletion {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, CompletionError> {
            Err(CompletionError::Api {
                status: 503,
                message: "overloaded".to_string(),
            })
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed_text(&self, _text: &str) -> codeqa_embed::Result<Embedding> {
            Err(EmbedError::embedding_gen("backend unavailable"))
        }

        fn embedding_dimension(&self) -> usize {
            0
        }

        fn provider_name(&self) -> &str {
            "broken"
        }
    }

    fn hashing_client() -> Arc<EmbeddingClient> {
        Arc::new(EmbeddingClient::from_config(&EmbedConfig::hashing()).unwrap())
    }

    fn write_project(root: &Path) {
        std::fs::write(
            root.join("auth.js"),
            "function authenticateUser(user, password) {\n  return checkPassword(user, password);\n}",
        )
        .unwrap();
        std::fs::write(
            root.join("button.js"),
            "function renderButton(label) {\n  return `<button>${label}</button>`;\n}",
        )
        .unwrap();
    }

    #[test]
    fn test_assemble_prompt_format() {
        let matches = vec![
            Match {
                score: 0.9,
                source_path: "src/a.ts".to_string(),
                text: "const a = 1;".to_string(),
            },
            Match {
                score: 0.5,
                source_path: "src/b.ts".to_string(),
                text: "const b = 2;".to_string(),
            },
        ];

        assert_eq!(
            assemble_prompt("What is a?", &matches),
            "// src/a.ts\nconst a = 1;\n\n// src/b.ts\nconst b = 2;\n\nQ: What is a?\nA:"
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_retrieve_context_logs_each_stage() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let qa = CodebaseQa::new(hashing_client(), None, RetrievalSettings::default());

        let context = qa
            .retrieve_context("how does authentication work?", dir.path(), Some(1))
            .await
            .unwrap();

        assert_eq!(context.files_scanned, 2);
        assert_eq!(context.matches.len(), 1);
        assert_eq!(context.matches[0].source_path, "auth.js");
        assert!(context.prompt.starts_with("// auth.js\nfunction authenticateUser"));
        assert!(context.prompt.ends_with("Q: how does authentication work?\nA:"));

        assert!(logs_contain("Loaded 2 source files"));
        assert!(logs_contain("Embedded"));
        assert!(logs_contain("Ranked"));
    }

    #[tokio::test]
    async fn test_answer_returns_completion_verbatim() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let completion = Arc::new(RecordingCompletion::default());
        let qa = CodebaseQa::new(
            hashing_client(),
            Some(completion.clone()),
            RetrievalSettings::default(),
        );

        let text = qa
            .answer_from_codebase("how does authentication work?", dir.path(), Some(4))
            .await
            .unwrap();

        assert_eq!(text, "  It checks the password.\n");
        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("// auth.js\n"));
        assert!(prompts[0].contains("// button.js\n"));
    }

    #[tokio::test]
    async fn test_empty_project_is_io_error() {
        let dir = tempdir().unwrap();
        let qa = CodebaseQa::new(hashing_client(), None, RetrievalSettings::default());

        let err = qa
            .retrieve_context("anything?", dir.path(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::NoMatchingFiles { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_blank_files_are_not_searchable() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("empty.ts"), "").unwrap();
        std::fs::write(dir.path().join("blank.py"), "\n   \n\n").unwrap();
        let qa = CodebaseQa::new(hashing_client(), None, RetrievalSettings::default());

        let err = qa.load_chunks(dir.path()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::NoMatchingFiles { .. }));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_embedding_kind() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let embedder = Arc::new(EmbeddingClient::new(Arc::new(BrokenEmbedder), 2).unwrap());
        let qa = CodebaseQa::new(embedder, None, RetrievalSettings::default());

        let err = qa.retrieve_context("q", dir.path(), Some(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Embedding);
    }

    #[tokio::test]
    async fn test_completion_failure_is_distinct() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let qa = CodebaseQa::new(
            hashing_client(),
            Some(Arc::new(FailingCompletion)),
            RetrievalSettings::default(),
        );

        let err = qa.answer("q", dir.path(), Some(1)).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Completion(CompletionError::Api { status: 503, .. })));
        assert_eq!(err.kind(), ErrorKind::Completion);
    }

    #[tokio::test]
    async fn test_missing_completion_provider() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let qa = CodebaseQa::new(hashing_client(), None, RetrievalSettings::default());

        let err = qa.answer("q", dir.path(), Some(1)).await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Completion(CompletionError::NotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_top_k_is_ranking_error() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let qa = CodebaseQa::new(hashing_client(), None, RetrievalSettings::default());

        let err = qa.retrieve_context("q", dir.path(), Some(0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ranking);
    }

    #[tokio::test]
    async fn test_custom_boundary_pattern() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("notes.md"),
            "intro\nSECTION one\nbody\nSECTION two",
        )
        .unwrap();
        let settings = RetrievalSettings {
            boundary_pattern: Some(r"^SECTION\b".to_string()),
            ..RetrievalSettings::default()
        };
        let qa = CodebaseQa::new(hashing_client(), None, settings);

        let project = qa.load_chunks(dir.path()).await.unwrap();
        let texts: Vec<&str> = project.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["intro\nSECTION one", "body\nSECTION two"]);
    }

    #[tokio::test]
    async fn test_settings_top_k_applies_when_unspecified() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        let settings = RetrievalSettings {
            top_k: 1,
            ..RetrievalSettings::default()
        };
        let qa = CodebaseQa::new(hashing_client(), None, settings);

        let context = qa.retrieve_context("x", dir.path(), None).await.unwrap();
        assert_eq!(context.matches.len(), 1);

        let context = qa.retrieve_context("x", dir.path(), Some(3)).await.unwrap();
        assert_eq!(context.matches.len(), 3);
    }

    #[tokio::test]
    async fn test_default_top_k_is_three() {
        let dir = tempdir().unwrap();
        write_project(dir.path());
        std::fs::write(
            dir.path().join("config.js"),
            "function parseConfig(text) {\n  return JSON.parse(text);\n}",
        )
        .unwrap();
        let qa = CodebaseQa::new(hashing_client(), None, RetrievalSettings::default());

        let context = qa.retrieve_context("x", dir.path(), None).await.unwrap();
        assert!(context.chunks_embedded > 3);
        assert_eq!(context.matches.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_boundary_pattern_fails_before_loading() {
        let dir = tempdir().unwrap();
        let settings = RetrievalSettings {
            boundary_pattern: Some("(unclosed".to_string()),
            ..RetrievalSettings::default()
        };
        let qa = CodebaseQa::new(hashing_client(), None, settings);

        let err = qa.load_chunks(dir.path()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Chunking(_)));
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
