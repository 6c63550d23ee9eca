//! Single-document extraction.
//!
//! Composes the pieces for one PDF:
//!   1. Parse the bytes (unreadable documents stop here with a failure record)
//!   2. Per-page raw text and page records
//!   3. Tables from each page's raw text
//!   4. Sections from the line-preserving cleaned text
//!   5. Fully cleaned text and its chunks
//!   6. Info-dictionary metadata and the summary
//!
//! Extraction is synchronous and CPU-bound; async callers go through
//! `spawn_blocking` (see `batch`).

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::chunker::{chunk_text, ChunkerConfig};
use crate::cleaner::{clean, clean_lines};
use crate::error::{IngestError, Result};
use crate::models::{
    DocumentMetadata, Extraction, ExtractionFailure, ExtractionRecord, ExtractionResult, ExtractionWarning,
    Summary, TextContent,
};
use crate::pdf_parser::{page_records, with_document, RawPage};
use crate::sections::{KeywordSegmenter, Segmenter};
use crate::tables::tables_for_page;

/// Extracts content from PDFs with a fixed chunking and segmentation setup.
#[derive(Clone)]
pub struct Extractor {
    chunker: ChunkerConfig,
    segmenter: Arc<dyn Segmenter>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("chunker", &self.chunker)
            .field("segmenter", &self.segmenter.name())
            .finish()
    }
}

impl Extractor {
    pub fn new(chunker: ChunkerConfig) -> Self {
        Self {
            chunker,
            segmenter: Arc::new(KeywordSegmenter),
        }
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn chunker(&self) -> &ChunkerConfig {
        &self.chunker
    }

    /// Read and extract a file. Never fails: an unreadable document comes
    /// back as a failure record.
    pub fn extract_path(&self, path: &Path) -> Extraction {
        match std::fs::read(path) {
            Ok(bytes) => self.extract_bytes(path, &bytes),
            Err(e) => failed(path, &IngestError::unreadable(path, e)),
        }
    }

    /// Extract from bytes already in memory. `path` is used for naming only.
    #[instrument(skip(self, bytes), fields(file = %file_name(path), size = bytes.len()))]
    pub fn extract_bytes(&self, path: &Path, bytes: &[u8]) -> Extraction {
        match self.try_extract(path, bytes) {
            Ok((result, warnings)) => {
                info!(
                    pages = result.summary.total_pages,
                    tables = result.summary.total_tables,
                    chunks = result.summary.total_chunks,
                    words = result.summary.total_words,
                    warnings = warnings.len(),
                    "Extraction complete"
                );
                Extraction {
                    record: ExtractionRecord::Success(Box::new(result)),
                    warnings,
                }
            }
            Err(e) => failed(path, &e),
        }
    }

    fn try_extract(
        &self,
        path: &Path,
        bytes: &[u8],
    ) -> Result<(ExtractionResult, Vec<ExtractionWarning>)> {
        let (raw_pages, metadata) =
            with_document(path, bytes, |doc| Ok((doc.raw_pages(), doc.metadata())))?;
        Ok(self.assemble(path, bytes.len() as u64, &raw_pages, metadata))
    }

    /// Build the result from already extracted page text. Pages whose text
    /// could not be read stay in the output, empty, with a warning each for
    /// the page and its tables.
    fn assemble(
        &self,
        path: &Path,
        file_size: u64,
        raw_pages: &[RawPage],
        metadata: DocumentMetadata,
    ) -> (ExtractionResult, Vec<ExtractionWarning>) {
        let mut warnings = Vec::new();
        let pages_text = page_records(raw_pages, &mut warnings);

        // ── Tables ──
        let mut tables = Vec::new();
        for page in raw_pages {
            match &page.text {
                Some(text) => tables.extend(tables_for_page(page.page_number, text)),
                None => warnings.push(ExtractionWarning::Table {
                    page_number: page.page_number,
                    reason: "page text unavailable".to_string(),
                }),
            }
        }

        // ── Text, sections, chunks ──
        let raw_full_text = raw_pages
            .iter()
            .map(|p| p.text.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n");
        let sections = self.segmenter.segment(&clean_lines(&raw_full_text));
        let full_text = clean(&raw_full_text);
        let text_chunks = chunk_text(&full_text, &self.chunker);

        let summary = Summary {
            total_pages: metadata.num_pages,
            total_tables: tables.len(),
            total_chunks: text_chunks.len(),
            total_words: full_text.split_whitespace().count(),
            extraction_success: true,
        };

        let result = ExtractionResult {
            file_path: path.display().to_string(),
            file_name: file_name(path),
            file_size,
            extraction_timestamp: Utc::now(),
            metadata,
            text_content: TextContent {
                full_text,
                pages_text,
                sections,
            },
            tables,
            text_chunks,
            summary,
        };
        (result, warnings)
    }
}

/// Extract one file with the default segmenter.
pub fn extract_pdf_content(path: &Path, chunker: &ChunkerConfig) -> Extraction {
    Extractor::new(*chunker).extract_path(path)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Failure-shaped record for a document that produced no result.
pub fn failure_record(path: &Path, error: &IngestError) -> ExtractionRecord {
    ExtractionRecord::Failure(ExtractionFailure {
        file_path: path.display().to_string(),
        file_name: file_name(path),
        extraction_timestamp: Utc::now(),
        extraction_success: false,
        error: error.to_string(),
    })
}

fn failed(path: &Path, error: &IngestError) -> Extraction {
    warn!(file = %file_name(path), error = %error, "Extraction failed");
    Extraction {
        record: failure_record(path, error),
        warnings: Vec::new(),
    }
}
