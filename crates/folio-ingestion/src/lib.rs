//! folio-ingestion — PDF content extraction and chunking.
//!
//! - Per-page text and metadata via lopdf
//! - Text cleaning
//! - Keyword section segmentation
//! - Table detection on page text
//! - Sentence-snapped overlapping chunks
//! - Batch extraction with blob storage
//! - Title to file name matching for paper indexes

pub mod batch;
pub mod chunker;
pub mod cleaner;
pub mod error;
pub mod matching;
pub mod models;
pub mod pdf_parser;
pub mod pipeline;
pub mod sections;
pub mod tables;

pub use batch::{BatchOptions, BatchReport, BatchRunner, DocumentJob, DocumentOutcome};
pub use chunker::{chunk_text, ChunkerConfig};
pub use cleaner::clean;
pub use error::{IngestError, Result};
pub use models::*;
pub use pipeline::{extract_pdf_content, Extractor};
pub use sections::{HeadingSegmenter, KeywordSegmenter, Segmenter};
