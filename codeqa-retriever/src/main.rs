use clap::{Parser, Subcommand};
use codeqa_embed::EmbeddingClient;
use codeqa_retriever::completion::{ChatCompletionClient, CompletionProvider};
use codeqa_retriever::config::CodeQaConfig;
use codeqa_retriever::retrieval::{CodebaseQa, RetrievedContext};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ask questions about a codebase, answered from its own source code.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to <DIR>/.codeqa.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question using the most relevant code as context
    Ask {
        question: String,
        /// Project directory
        #[arg(short = 'd', long, default_value = ".")]
        dir: PathBuf,
        /// Number of code chunks to use as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show the code chunks most similar to a query, without asking a model
    Search {
        query: String,
        /// Project directory
        #[arg(short = 'd', long, default_value = ".")]
        dir: PathBuf,
        /// Number of matches to show
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// List the files that would be searched and how many chunks each yields
    Files {
        /// Project directory
        #[arg(short = 'd', long, default_value = ".")]
        dir: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct FileOutput {
    path: String,
    chunks: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn build_qa(config: &CodeQaConfig, with_completion: bool) -> anyhow::Result<CodebaseQa> {
    let embedder = Arc::new(EmbeddingClient::from_config(&config.embedding)?);
    let completion: Option<Arc<dyn CompletionProvider>> = if with_completion {
        Some(Arc::new(ChatCompletionClient::new(config.completion.clone())?))
    } else {
        None
    };
    Ok(CodebaseQa::new(embedder, completion, config.retrieval_settings()))
}

fn load_config(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<CodeQaConfig> {
    Ok(CodeQaConfig::discover(explicit, dir)?)
}

fn print_context(context: &RetrievedContext) {
    println!(
        "Searched {} chunks from {} files. Top {} matches:",
        context.chunks_embedded,
        context.files_scanned,
        context.matches.len()
    );
    for (rank, m) in context.matches.iter().enumerate() {
        println!("\n#{} {} (score {:.3})", rank + 1, m.source_path, m.score);
        for line in m.text.lines() {
            println!("    {line}");
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Ask {
            question,
            dir,
            top_k,
            format,
        } => {
            let config = load_config(args.config.as_deref(), &dir)?;
            let qa = build_qa(&config, true)?;

            let context = qa.retrieve_context(&question, &dir, top_k).await?;
            match qa.complete(context.clone()).await {
                Ok(answer) => match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&answer)?);
                    }
                    OutputFormat::Summary => {
                        print_context(&answer.context);
                        println!("\nAnswer:\n{}", answer.text);
                    }
                },
                Err(e) => {
                    // The retrieved context is still useful without an answer
                    match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&context)?)
                        }
                        OutputFormat::Summary => print_context(&context),
                    }
                    return Err(e.into());
                }
            }
            Ok(())
        }
        Commands::Search {
            query,
            dir,
            top_k,
            format,
        } => {
            let config = load_config(args.config.as_deref(), &dir)?;
            let qa = build_qa(&config, false)?;

            let context = qa.retrieve_context(&query, &dir, top_k).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&context.matches)?);
                }
                OutputFormat::Summary => print_context(&context),
            }
            Ok(())
        }
        Commands::Files { dir, format } => {
            let config = load_config(args.config.as_deref(), &dir)?;
            let qa = build_qa(&config, false)?;

            let project = qa.load_chunks(&dir).await?;
            let mut counts: BTreeMap<&str, usize> = project
                .files
                .iter()
                .map(|file| (file.path.as_str(), 0))
                .collect();
            for chunk in &project.chunks {
                *counts.entry(chunk.source_path.as_str()).or_default() += 1;
            }

            let files: Vec<FileOutput> = counts
                .into_iter()
                .map(|(path, chunks)| FileOutput {
                    path: path.to_string(),
                    chunks,
                })
                .collect();
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&files)?);
                }
                OutputFormat::Summary => {
                    println!("{} files, {} chunks:", files.len(), project.chunks.len());
                    for file in &files {
                        println!("  {} ({} chunks)", file.path, file.chunks);
                    }
                }
            }
            Ok(())
        }
    }
}
