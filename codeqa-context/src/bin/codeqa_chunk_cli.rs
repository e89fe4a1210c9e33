use clap::Parser;
use codeqa_context::text::{CodeChunker, DEFAULT_MAX_CHUNK_LENGTH, create_chunker_for_path};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;

/// A CLI tool to chunk a source file into JSON output using codeqa-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// File path to record in the output. Also selects the boundary pattern.
    #[arg(short, long, default_value = "stdin")]
    path: String,

    /// Maximum length of each chunk, in characters.
    #[arg(short, long, default_value_t = DEFAULT_MAX_CHUNK_LENGTH)]
    max_length: usize,

    /// Custom boundary regex, matched against each line.
    #[arg(short, long)]
    boundary: Option<String>,
}

#[derive(Serialize)]
struct ChunkRecord<'a> {
    path: &'a str,
    sequence: usize,
    text: &'a str,
    chars: usize,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (file_content, path) = if let Some(input_path) = args.input {
        let content = fs::read_to_string(&input_path)?;
        let path = if args.path == "stdin" {
            input_path
        } else {
            args.path
        };
        (content, path)
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        (buffer, args.path)
    };

    let chunker = match &args.boundary {
        Some(pattern) => CodeChunker::with_boundary_pattern(args.max_length, pattern)?,
        None => create_chunker_for_path(Path::new(&path), Some(args.max_length))?,
    };

    let chunks = chunker.chunk_file(&path, &file_content);

    let records: Vec<ChunkRecord> = chunks
        .iter()
        .map(|c| ChunkRecord {
            path: &c.source_path,
            sequence: c.sequence,
            text: &c.text,
            chars: c.char_len(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
