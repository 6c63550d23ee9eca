//! lopdf-backed document access.
//!
//! A `PdfDocument` only lives inside `with_document`, so the parsed object
//! graph is released as soon as the caller's closure returns, on the error
//! path as well.

use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::models::{DocumentMetadata, ExtractionWarning, PageRecord};

/// An opened, readable PDF.
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
}

/// Raw text of one page. `text` is `None` when the page could not be read.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub page_number: u32,
    pub text: Option<String>,
}

/// Parse `bytes` and run `f` against the document.
pub fn with_document<F, R>(path: &Path, bytes: &[u8], f: F) -> Result<R>
where
    F: FnOnce(&PdfDocument) -> Result<R>,
{
    let document = PdfDocument::parse(path, bytes)?;
    f(&document)
}

impl PdfDocument {
    fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| IngestError::unreadable(path, e))?;
        Self::from_lopdf(path, doc)
    }

    /// Wrap an already loaded document. Encrypted documents are refused.
    pub fn from_lopdf(path: impl Into<PathBuf>, doc: Document) -> Result<Self> {
        let path = path.into();
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(IngestError::unreadable(path, "document is encrypted"));
        }
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Text of every page in page order. Unreadable pages come back as `None`.
    pub fn raw_pages(&self) -> Vec<RawPage> {
        self.doc
            .get_pages()
            .keys()
            .map(|&page_number| {
                let text = match self.doc.extract_text(&[page_number]) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        debug!(file = %self.path.display(), page = page_number, error = %e, "Page text extraction failed");
                        None
                    }
                };
                RawPage { page_number, text }
            })
            .collect()
    }

    /// Values from the trailer's `Info` dictionary.
    pub fn metadata(&self) -> DocumentMetadata {
        let info = self.info_dictionary();
        let field = |key: &[u8]| {
            info.and_then(|d| d.get(key).ok())
                .and_then(|obj| self.resolve(obj))
                .and_then(|obj| match obj {
                    Object::String(bytes, _) => Some(decode_text_string(bytes)),
                    _ => None,
                })
                .unwrap_or_default()
        };

        DocumentMetadata {
            num_pages: self.page_count(),
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            creation_date: field(b"CreationDate"),
            modification_date: field(b"ModDate"),
        }
    }

    fn info_dictionary(&self) -> Option<&Dictionary> {
        match self.doc.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when a byte order mark says
/// so, otherwise one byte per character.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Turn raw pages into page records, collecting a warning for every page
/// that yielded no text. Every page gets a record.
pub fn page_records(raw: &[RawPage], warnings: &mut Vec<ExtractionWarning>) -> Vec<PageRecord> {
    raw.iter()
        .map(|page| {
            let text = page.text.as_deref().map(str::trim).unwrap_or_default();
            if text.is_empty() {
                let reason = match page.text {
                    Some(_) => "no extractable text",
                    None => "text extraction failed",
                };
                warnings.push(ExtractionWarning::Page {
                    page_number: page.page_number,
                    reason: reason.to_string(),
                });
            }
            PageRecord {
                page_number: page.page_number,
                word_count: text.split_whitespace().count(),
                text: text.to_string(),
            }
        })
        .collect()
}
