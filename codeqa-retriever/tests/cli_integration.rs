use anyhow::Result;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the `codeqa` binary with `args`
fn run_cli(args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_codeqa"))
        .args(args)
        .env("RUST_LOG", "error") // Reduce log noise
        .env_remove("CODEQA_TEST_UNSET_KEY")
        .output()?;
    Ok(output)
}

/// A small project configured for offline hashing embeddings
fn create_project() -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    std::fs::create_dir_all(root.join("src"))?;
    std::fs::write(
        root.join("src/auth.ts"),
        "export function authenticateUser(user: User, password: string) {\n  return verifyPassword(user, password);\n}\n",
    )?;
    std::fs::write(
        root.join("src/button.tsx"),
        "export function renderButton(label: string) {\n  return <button>{label}</button>;\n}\n",
    )?;
    std::fs::write(
        root.join(".codeqa.toml"),
        "[embedding]\nprovider = \"hashing\"\n\n[completion]\napi_key_env = \"CODEQA_TEST_UNSET_KEY\"\n",
    )?;
    Ok(dir)
}

fn dir_arg(dir: &Path) -> String {
    dir.to_string_lossy().into_owned()
}

#[test]
fn test_cli_help() -> Result<()> {
    let output = run_cli(&["--help"])?;
    assert!(
        output.status.success(),
        "CLI help command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("ask"));
    assert!(stdout.contains("search"));
    assert!(stdout.contains("files"));
    assert!(stdout.contains("--config"));

    Ok(())
}

#[test]
fn test_cli_subcommand_help() -> Result<()> {
    let output = run_cli(&["search", "--help"])?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("--dir"));
    assert!(stdout.contains("--top-k"));
    assert!(stdout.contains("--format"));

    Ok(())
}

#[test]
fn test_cli_files_lists_chunk_counts() -> Result<()> {
    let project = create_project()?;
    let dir = dir_arg(project.path());

    let output = run_cli(&["files", "-d", &dir])?;
    assert!(
        output.status.success(),
        "files failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("2 files"));
    assert!(stdout.contains("src/auth.ts"));
    assert!(stdout.contains("src/button.tsx"));
    assert!(!stdout.contains(".codeqa.toml"));

    Ok(())
}

#[test]
fn test_cli_search_json() -> Result<()> {
    let project = create_project()?;
    let dir = dir_arg(project.path());

    let output = run_cli(&[
        "search",
        "authenticateUser password",
        "-d",
        &dir,
        "-k",
        "1",
        "--format",
        "json",
    ])?;
    assert!(
        output.status.success(),
        "search failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let matches: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let matches = matches.as_array().expect("search prints a JSON array");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["source_path"], "src/auth.ts");
    assert!(matches[0]["score"].is_number());

    Ok(())
}

#[test]
fn test_cli_search_uses_configured_top_k() -> Result<()> {
    let project = create_project()?;
    let config = project.path().join(".codeqa.toml");
    let mut content = std::fs::read_to_string(&config)?;
    content.push_str("\n[retrieval]\ntop_k = 1\n");
    std::fs::write(&config, content)?;
    let dir = dir_arg(project.path());

    let output = run_cli(&["search", "renderButton", "-d", &dir, "--format", "json"])?;
    assert!(
        output.status.success(),
        "search failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let matches: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(matches.as_array().map(Vec::len), Some(1));

    Ok(())
}

#[test]
fn test_cli_ask_without_api_key_prints_context_then_fails() -> Result<()> {
    let project = create_project()?;
    let dir = dir_arg(project.path());

    let output = run_cli(&["ask", "How are users authenticated?", "-d", &dir])?;
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("src/auth.ts"));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("CODEQA_TEST_UNSET_KEY"));

    Ok(())
}

#[test]
fn test_cli_missing_directory() -> Result<()> {
    let project = create_project()?;
    let missing = project.path().join("does-not-exist");

    let config = dir_arg(&project.path().join(".codeqa.toml"));

    let output = run_cli(&[
        "--config",
        &config,
        "search",
        "anything",
        "-d",
        &dir_arg(&missing),
    ])?;
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("not found"));

    Ok(())
}

#[test]
fn test_cli_invalid_format() -> Result<()> {
    let output = run_cli(&["search", "anything", "--format", "xml"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid format"));
    Ok(())
}
