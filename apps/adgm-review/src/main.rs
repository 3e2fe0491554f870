//! ADGM Review Binary
//!
//! Reviews `.docx` filings and writes annotated copies plus a JSON report.

use adgm_review::{run, RunConfig};
use anyhow::Result;
use clap::Parser;
use corpus_core::CorpusConfig;
use shared_types::ProcessCategory;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "adgm-review")]
#[command(version, about = "Review ADGM filings for missing clauses and red flags")]
struct Args {
    /// `.docx` files submitted together
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Review policy TOML (defaults to the embedded ADGM policy)
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Directory of reference documents (overrides ADGM_REFERENCE_DIR)
    #[arg(long)]
    references: Option<PathBuf>,

    /// Process category for every file, e.g. "incorporation" or "employment"
    #[arg(long)]
    process: Option<ProcessCategory>,

    /// Output directory
    #[arg(short, long, default_value = "outputs")]
    out: PathBuf,

    /// Retrieval timeout in milliseconds (overrides ADGM_RETRIEVAL_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the summary; logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting adgm-review v{}", env!("CARGO_PKG_VERSION"));

    let mut corpus = CorpusConfig::from_env()?;
    if let Some(dir) = args.references {
        corpus.reference_dir = Some(dir);
    }
    if let Some(ms) = args.timeout_ms {
        corpus.timeout = Duration::from_millis(ms);
    }

    let config = RunConfig {
        files: args.files,
        policy: args.policy,
        process: args.process,
        out_dir: args.out,
        corpus,
    };
    let (review, outputs) = run(&config).await?;
    let report = &review.report;

    println!("Process: {}", report.process);
    for document in &report.documents {
        println!(
            "  {}: {} satisfied, {} issues",
            document.document_name.as_deref().unwrap_or("?"),
            document.summary.satisfied,
            document.summary.issues()
        );
    }
    for failure in &report.failures {
        println!("  {}: FAILED ({})", failure.document_name, failure.error);
    }
    if !report.missing_documents.is_empty() {
        println!("Missing documents: {}", report.missing_documents.join(", "));
    }
    println!("Report: {}", outputs.report.display());
    for path in &outputs.reviewed {
        println!("Reviewed: {}", path.display());
    }

    if report.documents.is_empty() {
        anyhow::bail!("No document could be reviewed");
    }
    Ok(())
}
