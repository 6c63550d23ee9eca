//! Data models for the extraction pipeline.
//!
//! Field names and nesting of `ExtractionResult` are the output contract read
//! by downstream indexers, so renames here are breaking changes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ── Caller-supplied paper description ────────────────────────────────────────

/// Descriptive metadata for a paper, as found in a paper index. Passed
/// through to the output unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_found: bool,
    /// Any other index columns.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl PaperMetadata {
    /// The local PDF for this paper, if the index says there is one.
    pub fn pdf_path(&self) -> Option<PathBuf> {
        match &self.file_path {
            Some(p) if self.file_found && !p.is_empty() => Some(PathBuf::from(p)),
            _ => None,
        }
    }
}

/// Index files carry years both as `2021` and `"2021"`.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// One paper from an index together with its extracted content.
#[derive(Debug, Clone, Serialize)]
pub struct PaperRecord {
    #[serde(flatten)]
    pub paper: PaperMetadata,
    pub pdf_content: Option<ExtractionRecord>,
    pub content_extracted: bool,
    pub content_extraction_timestamp: DateTime<Utc>,
}

// ── Sections ─────────────────────────────────────────────────────────────────

/// Logical section names. `Unknown` holds text seen before the first heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Abstract,
    Introduction,
    Methods,
    Results,
    Discussion,
    References,
    Appendix,
    Unknown,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Abstract     => "abstract",
            SectionKind::Introduction => "introduction",
            SectionKind::Methods      => "methods",
            SectionKind::Results      => "results",
            SectionKind::Discussion   => "discussion",
            SectionKind::References   => "references",
            SectionKind::Appendix     => "appendix",
            SectionKind::Unknown      => "unknown",
        }
    }
}

/// Section name to accumulated text, in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMap {
    entries: Vec<(SectionKind, String)>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: SectionKind) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, text)| text.as_str())
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionKind, &str)> {
        self.entries.iter().map(|(k, text)| (*k, text.as_str()))
    }

    /// Make sure `kind` has an entry, empty if new.
    pub(crate) fn ensure(&mut self, kind: SectionKind) -> &mut String {
        let idx = match self.entries.iter().position(|(k, _)| *k == kind) {
            Some(idx) => idx,
            None => {
                self.entries.push((kind, String::new()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Append text to a section, newline separated from what it already holds.
    pub(crate) fn append(&mut self, kind: SectionKind, text: &str) {
        let slot = self.ensure(kind);
        if text.is_empty() {
            return;
        }
        if !slot.is_empty() {
            slot.push('\n');
        }
        slot.push_str(text);
    }
}

impl Serialize for SectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter().map(|(k, text)| (k.as_str(), text)))
    }
}

// ── Extraction output ────────────────────────────────────────────────────────

/// Text of one physical page. Empty pages are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub page_number: u32,
    pub text: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRecord {
    pub table_id: String,
    pub page_number: u32,
    /// 1-based position among the tables of its page.
    pub table_index: usize,
    pub data: Vec<Vec<String>>,
    pub rows: usize,
    pub columns: usize,
}

/// A window of the cleaned full text. Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
    pub word_count: usize,
}

/// Values from the PDF `Info` dictionary. Missing keys are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub num_pages: usize,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
    pub creation_date: String,
    pub modification_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub full_text: String,
    pub pages_text: Vec<PageRecord>,
    pub sections: SectionMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_pages: usize,
    pub total_tables: usize,
    pub total_chunks: usize,
    pub total_words: usize,
    pub extraction_success: bool,
}

/// Everything extracted from one readable document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub extraction_timestamp: DateTime<Utc>,
    pub metadata: DocumentMetadata,
    pub text_content: TextContent,
    pub tables: Vec<TableRecord>,
    pub text_chunks: Vec<Chunk>,
    pub summary: Summary,
}

/// Minimal record for a document that could not be extracted.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub file_path: String,
    pub file_name: String,
    pub extraction_timestamp: DateTime<Utc>,
    pub extraction_success: bool,
    pub error: String,
}

/// The per-document output: full result or failure shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExtractionRecord {
    Success(Box<ExtractionResult>),
    Failure(ExtractionFailure),
}

impl ExtractionRecord {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionRecord::Success(_))
    }

    pub fn file_name(&self) -> &str {
        match self {
            ExtractionRecord::Success(r) => &r.file_name,
            ExtractionRecord::Failure(f) => &f.file_name,
        }
    }

    pub fn as_success(&self) -> Option<&ExtractionResult> {
        match self {
            ExtractionRecord::Success(r) => Some(&**r),
            ExtractionRecord::Failure(_) => None,
        }
    }
}

/// Non-fatal problems met while extracting a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// The page produced no text; an empty page record was kept.
    Page { page_number: u32, reason: String },
    /// The page's tables could not be read and were left out.
    Table { page_number: u32, reason: String },
}

/// A record plus the warnings collected while producing it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: ExtractionRecord,
    pub warnings: Vec<ExtractionWarning>,
}
