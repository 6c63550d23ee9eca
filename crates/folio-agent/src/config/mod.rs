//! Configuration loading for Folio.
//! Reads folio.toml from the current directory or the path in FOLIO_CONFIG.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use folio_ingestion::{BatchOptions, ChunkerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// `keyword` or `heading`.
    #[serde(default = "default_segmenter")]
    pub segmenter: String,
}

fn default_chunk_size() -> usize  { 1000 }
fn default_overlap()    -> usize  { 200 }
fn default_segmenter()  -> String { "keyword".to_string() }

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            segmenter: default_segmenter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_document_timeout")]
    pub document_timeout_secs: u64,
}

fn default_workers()          -> usize { 3 }
fn default_document_timeout() -> u64   { 300 }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            document_timeout_secs: default_document_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_blob_root")]
    pub blob_root: PathBuf,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn default_blob_root() -> PathBuf { PathBuf::from("./data/blobs") }
fn bool_true()         -> bool    { true }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_root: default_blob_root(),
            enabled: bool_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

fn default_output_path() -> PathBuf { PathBuf::from("./data/processed/papers_with_content.json") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: default_output_path() }
    }
}


impl Config {
    /// Load configuration from folio.toml.
    /// Checks FOLIO_CONFIG env var first, then the current directory. A
    /// missing file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("FOLIO_CONFIG").unwrap_or_else(|_| "folio.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::parse(&content).with_context(|| format!("parsing {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with, before any document is
    /// touched.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.chunker()?;
        if self.batch.workers == 0 {
            anyhow::bail!("batch.workers must be at least 1");
        }
        if !matches!(self.chunking.segmenter.as_str(), "keyword" | "heading") {
            anyhow::bail!(
                "chunking.segmenter must be \"keyword\" or \"heading\", got {:?}",
                self.chunking.segmenter
            );
        }
        Ok(())
    }

    pub fn chunker(&self) -> anyhow::Result<ChunkerConfig> {
        Ok(ChunkerConfig::new(self.chunking.chunk_size, self.chunking.overlap)?)
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            workers: self.batch.workers,
            document_timeout: Duration::from_secs(self.batch.document_timeout_secs),
        }
    }
}
