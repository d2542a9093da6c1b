use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;
use worldhub_author::{ConflictPolicy, reconcile};
use worldhub_kernel::ProjectDefinition;

const DEFINITION_FILE: &str = "project.json";

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for worldhub")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Validate a directory of `<slug>/project.json` definitions
    Catalog {
        /// Directory containing one sub-directory per slug
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Doc => run_doc()?,
        Commands::Build => cargo("cargo build", &["build", "--workspace"])?,
        Commands::Catalog { dir } => check_catalog(&dir)?,
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> Running {step}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt --check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    cargo(
        "cargo clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn run_tests() -> Result<()> {
    cargo("cargo test", &["test", "--workspace"])
}

fn run_doc() -> Result<()> {
    cargo("cargo doc", &["doc", "--workspace", "--no-deps"])
}

/// Parse every definition under `dir` and run them through reconciliation,
/// reporting unreadable documents and every definition that would be dropped.
fn check_catalog(dir: &Path) -> Result<()> {
    println!("==> Validating catalog {}", dir.display());
    let mut slugs: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().join(DEFINITION_FILE).is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    slugs.sort();

    let mut problems = 0usize;
    let mut definitions = Vec::new();
    for slug in &slugs {
        let path = dir.join(slug).join(DEFINITION_FILE);
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        match ProjectDefinition::from_json(&bytes) {
            Ok(definition) => definitions.push(definition),
            Err(e) => {
                problems += 1;
                println!("  {slug}: malformed: {e}");
            }
        }
    }

    let parsed = definitions.len();
    let result = reconcile(definitions, &[], ConflictPolicy::DefinitionWins)?;
    for rejection in &result.rejected {
        problems += 1;
        println!(
            "  project {} ({:?}): {:?}",
            rejection.id, rejection.name, rejection.reason
        );
    }

    println!(
        "{} slug(s), {parsed} parsed, {} accepted, {problems} problem(s)",
        slugs.len(),
        result.accepted.len()
    );
    if problems > 0 {
        anyhow::bail!("catalog has {problems} problem(s)");
    }
    Ok(())
}
