//! Discovers and reads the source files of a project

use crate::error::{Result, RetrievalError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// Extensions scanned when no include globs are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "py", "json", "rs", "go", "java", "rb", "php", "cs", "c", "cpp",
    "h", "hpp", "md",
];

/// Paths never scanned unless the exclude list is replaced.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/.next/**",
    "**/.env",
    "**/.env/**",
    "**/target/**",
    "**/.git/**",
];

/// A file's content and its path relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Relative, `/`-separated path
    pub path: String,
    pub content: String,
}

/// Which files to load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Globs a relative path must match to be loaded
    pub include: Vec<String>,
    /// Globs that exclude a relative path even if it matches `include`
    pub exclude: Vec<String>,
    /// Honor `.gitignore`, `.ignore` and git exclude files
    pub respect_gitignore: bool,
    /// Descend into hidden files and directories
    pub include_hidden: bool,
    /// Files larger than this are skipped
    pub max_file_bytes: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            include: DEFAULT_EXTENSIONS
                .iter()
                .map(|ext| format!("**/*.{ext}"))
                .collect(),
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            respect_gitignore: true,
            include_hidden: false,
            max_file_bytes: 1024 * 1024,
        }
    }
}

impl LoaderConfig {
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_respect_gitignore(mut self, respect_gitignore: bool) -> Self {
        self.respect_gitignore = respect_gitignore;
        self
    }

    pub fn with_include_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| RetrievalError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| RetrievalError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// `/`-joined path of `path` below `root`
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Load every file under `root` matching `include` and not `exclude`.
///
/// Other loader settings take their defaults.
pub async fn load_source_files(
    root: impl AsRef<Path>,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<SourceFile>> {
    let config = LoaderConfig::default()
        .with_include(include.to_vec())
        .with_exclude(exclude.to_vec());
    load_source_files_with(root, &config).await
}

/// Load the files under `root` selected by `config`, sorted by path.
///
/// Unreadable and non-UTF-8 files are skipped with a warning.
pub async fn load_source_files_with(
    root: impl AsRef<Path>,
    config: &LoaderConfig,
) -> Result<Vec<SourceFile>> {
    let root = root.as_ref().to_path_buf();
    ensure_directory(&root).await?;

    let include = build_globset(&config.include)?;
    let exclude = build_globset(&config.exclude)?;
    let config = config.clone();

    tracing::debug!("Scanning {} for source files", root.display());
    let files =
        tokio::task::spawn_blocking(move || walk_sync(&root, &config, &include, &exclude))
            .await?;
    Ok(files)
}

async fn ensure_directory(root: &Path) -> Result<()> {
    match tokio::fs::metadata(root).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(RetrievalError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RetrievalError::RootNotFound {
                path: root.to_path_buf(),
            })
        }
        Err(e) => Err(RetrievalError::io(root, e)),
    }
}

fn walk_sync(
    root: &Path,
    config: &LoaderConfig,
    include: &GlobSet,
    exclude: &GlobSet,
) -> Vec<SourceFile> {
    let walker = WalkBuilder::new(root)
        .hidden(!config.include_hidden)
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .ignore(config.respect_gitignore)
        .parents(config.respect_gitignore)
        // .gitignore applies even outside a git checkout
        .require_git(false)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Error walking directory: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(relative) = relative_path(root, path) else {
            continue;
        };
        if exclude.is_match(&relative) || !include.is_match(&relative) {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) if metadata.len() > config.max_file_bytes => {
                tracing::warn!(
                    "Skipping {}: {} bytes exceeds limit of {}",
                    relative,
                    metadata.len(),
                    config.max_file_bytes
                );
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to get metadata for {}: {}", relative, e);
                continue;
            }
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping unreadable file {}: {}", relative, e);
                continue;
            }
        };
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                tracing::warn!("Skipping non-UTF-8 file {}", relative);
                continue;
            }
        };

        files.push(SourceFile {
            path: relative,
            content,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("Found {} source files", files.len());
    files
}
