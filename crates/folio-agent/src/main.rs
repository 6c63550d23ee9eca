//! Folio — PDF content extraction and chunking.
//! Entry point for the `folio` binary.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_common::is_digest;
use folio_db::{BlobId, BlobStore, FsBlobStore};
use folio_ingestion::batch::{load_paper_index, write_json};
use folio_ingestion::matching::find_pdf_file;
use folio_ingestion::{BatchRunner, Extractor, HeadingSegmenter, KeywordSegmenter, Segmenter};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Extract text, sections, tables and chunks from PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract one PDF and print the result as JSON
    Extract {
        pdf: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Extract every PDF under a directory, or the papers of an index
    Batch {
        dir: PathBuf,
        /// JSON paper index; unmatched papers are looked up under DIR by title
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip the blob store even if enabled in config
        #[arg(long)]
        no_store: bool,
    },
    /// Re-hash a stored blob and compare with its recorded digest
    Verify {
        blob_id: String,
        /// Also compare against this file on disk
        #[arg(long)]
        original: Option<PathBuf>,
    },
    /// Blob store totals
    Stats,
}

fn build_extractor(config: &config::Config) -> anyhow::Result<Extractor> {
    let segmenter: Arc<dyn Segmenter> = match config.chunking.segmenter.as_str() {
        "heading" => Arc::new(HeadingSegmenter::default()),
        _ => Arc::new(KeywordSegmenter),
    };
    Ok(Extractor::new(config.chunker()?).with_segmenter(segmenter))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so JSON on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("folio=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;
    info!(version = env!("CARGO_PKG_VERSION"), "Folio starting");

    match cli.command {
        Command::Extract { pdf, pretty } => extract(&config, &pdf, pretty).await,
        Command::Batch { dir, index, output, no_store } => {
            batch(&config, &dir, index.as_deref(), output, no_store).await
        }
        Command::Verify { blob_id, original } => verify(&config, blob_id, original.as_deref()).await,
        Command::Stats => stats(&config).await,
    }
}

async fn extract(config: &config::Config, pdf: &Path, pretty: bool) -> anyhow::Result<()> {
    let extractor = build_extractor(config)?;
    let path = pdf.to_path_buf();
    let extraction = tokio::task::spawn_blocking(move || extractor.extract_path(&path)).await?;
    for warning in &extraction.warnings {
        warn!(?warning, "Extraction warning");
    }
    let json = if pretty {
        serde_json::to_string_pretty(&extraction.record)?
    } else {
        serde_json::to_string(&extraction.record)?
    };
    println!("{json}");
    if !extraction.record.is_success() {
        anyhow::bail!("extraction failed for {}", pdf.display());
    }
    Ok(())
}

async fn batch(
    config: &config::Config,
    dir: &Path,
    index: Option<&Path>,
    output: Option<PathBuf>,
    no_store: bool,
) -> anyhow::Result<()> {
    let mut runner = BatchRunner::new(build_extractor(config)?, config.batch_options());
    if config.storage.enabled && !no_store {
        let store = FsBlobStore::open(&config.storage.blob_root).await?;
        runner = runner.with_store(Arc::new(store));
    }
    let output = output.unwrap_or_else(|| config.output.path.clone());

    let report = match index {
        Some(index) => {
            let mut papers = load_paper_index(index)?;
            for paper in papers.iter_mut().filter(|p| p.pdf_path().is_none()) {
                if let Some(found) = find_pdf_file(&paper.title, paper.university.as_deref(), dir) {
                    paper.file_path = Some(found.display().to_string());
                    paper.file_found = true;
                }
            }
            let (records, report) = runner.process_papers(papers).await;
            write_json(&output, &records)?;
            report
        }
        None => {
            let (outcomes, report) = runner.run_directory(dir).await;
            let records: Vec<_> = outcomes.into_iter().map(|o| o.record).collect();
            write_json(&output, &records)?;
            report
        }
    };

    info!(output = %output.display(), "Results written");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn verify(config: &config::Config, blob_id: String, original: Option<&Path>) -> anyhow::Result<()> {
    if !is_digest(&blob_id) {
        anyhow::bail!("{blob_id:?} is not a blob id (expected 64 lowercase hex characters)");
    }
    let store = FsBlobStore::open(&config.storage.blob_root).await?;
    let report = store
        .verify(&BlobId::new(blob_id), original)
        .await
        .context("integrity check failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.size_match == Some(false) || report.original_hash_match == Some(false) {
        anyhow::bail!("stored blob differs from {}", original.map(|p| p.display().to_string()).unwrap_or_default());
    }
    Ok(())
}

async fn stats(config: &config::Config) -> anyhow::Result<()> {
    let store = FsBlobStore::open(&config.storage.blob_root).await?;
    let stats = store.stats().await?;
    info!(
        files = stats.total_files,
        size_mb = stats.total_size_mb(),
        "Storage statistics"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
