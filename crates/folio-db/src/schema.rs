//! Record definitions for the blob store.
//!
//! Field names of `BlobMetadata` match what earlier tooling wrote next to each
//! stored PDF (`original_filename`, `file_hash`, ...) so existing records stay
//! readable.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// MIME type recorded for stored documents.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a stored blob. Content-addressed: it is the blob's digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(String);

impl BlobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BlobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Write side
// =============================================================================

/// Caller-supplied description of a blob being stored.
#[derive(Debug, Clone, Default)]
pub struct BlobAttributes {
    pub original_filename: String,
    pub file_path: String,
    pub content_type: Option<String>,
    /// Descriptive fields passed through untouched (title, authors, university, year, ...).
    pub extra: Map<String, Value>,
}

impl BlobAttributes {
    /// Attributes for a file on disk; the name is the path's last component.
    pub fn for_file(path: impl AsRef<std::path::Path>) -> Self {
        let path = path.as_ref();
        Self {
            original_filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: path.display().to_string(),
            content_type: None,
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Result of a `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub id: BlobId,
    /// False when a blob with the same digest already existed.
    pub was_new: bool,
}

// =============================================================================
// Read side
// =============================================================================

/// Metadata recorded alongside each stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub id: BlobId,
    pub original_filename: String,
    pub file_path: String,
    pub file_size: u64,
    pub file_hash: String,
    pub upload_timestamp: DateTime<Utc>,
    pub content_type: String,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl BlobMetadata {
    pub(crate) fn new(digest: String, size: u64, attrs: BlobAttributes) -> Self {
        Self {
            id: BlobId::new(digest.clone()),
            original_filename: attrs.original_filename,
            file_path: attrs.file_path,
            file_size: size,
            file_hash: digest,
            upload_timestamp: Utc::now(),
            content_type: attrs
                .content_type
                .unwrap_or_else(|| PDF_CONTENT_TYPE.to_string()),
            extra: attrs.extra,
        }
    }

    /// Read a pass-through field as a display string (`"2021"` for a numeric year).
    pub fn extra_str(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Outcome of re-hashing a stored blob.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub id: BlobId,
    pub filename: String,
    pub stored_size: u64,
    pub stored_hash: String,
    pub current_hash: String,
    pub original_size: Option<u64>,
    pub original_hash: Option<String>,
    pub size_match: Option<bool>,
    pub original_hash_match: Option<bool>,
    pub verification_timestamp: DateTime<Utc>,
}

/// Aggregate numbers over everything in a store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub universities: BTreeMap<String, usize>,
    pub years: BTreeMap<String, usize>,
}

impl StorageStats {
    pub fn from_metadata<'a>(records: impl IntoIterator<Item = &'a BlobMetadata>) -> Self {
        let mut stats = Self::default();
        for meta in records {
            stats.total_files += 1;
            stats.total_size_bytes += meta.file_size;
            if let Some(university) = meta.extra_str("university") {
                *stats.universities.entry(university).or_default() += 1;
            }
            if let Some(year) = meta.extra_str("year") {
                *stats.years.entry(year).or_default() += 1;
            }
        }
        stats
    }

    pub fn total_size_mb(&self) -> f64 {
        (self.total_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(university: Option<&str>, year: Option<Value>, size: u64) -> BlobMetadata {
        let mut attrs = BlobAttributes::for_file("/papers/x.pdf");
        if let Some(u) = university {
            attrs = attrs.with_extra("university", u);
        }
        if let Some(y) = year {
            attrs = attrs.with_extra("year", y);
        }
        BlobMetadata::new("d".repeat(64), size, attrs)
    }

    #[test]
    fn test_for_file_takes_last_component() {
        let attrs = BlobAttributes::for_file("/data/raw/Publications/MIT/paper_one.pdf");
        assert_eq!(attrs.original_filename, "paper_one.pdf");
        assert_eq!(attrs.file_path, "/data/raw/Publications/MIT/paper_one.pdf");
    }

    #[test]
    fn test_metadata_flattens_extra_fields() {
        let m = meta(Some("MIT"), Some(json!(2021)), 10);
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["university"], "MIT");
        assert_eq!(value["year"], 2021);
        assert_eq!(value["content_type"], PDF_CONTENT_TYPE);
        assert_eq!(value["file_hash"], value["id"]);

        let back: BlobMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_stats_group_by_university_and_year() {
        let records = vec![
            meta(Some("MIT"), Some(json!(2021)), 1024 * 1024),
            meta(Some("MIT"), Some(json!(2022)), 1024 * 1024),
            meta(Some("ETH"), Some(json!(2021)), 0),
            meta(None, None, 0),
        ];
        let stats = StorageStats::from_metadata(&records);
        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.universities["MIT"], 2);
        assert_eq!(stats.universities["ETH"], 1);
        assert_eq!(stats.years["2021"], 2);
        assert_eq!(stats.total_size_mb(), 2.0);
    }
}
