//! folio-test-utils — PDF fixtures generated in-process for tests.
//!
//! Every fixture is built with `lopdf` at test time, so no binary PDFs are
//! checked in. Each text line is written in its own `BT`/`ET` block, which
//! makes `lopdf` report it on its own line when extracting.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

/// Builder for small synthetic PDFs.
#[derive(Debug, Clone, Default)]
pub struct PdfFixture {
    pages: Vec<Vec<String>>,
    info: Vec<(String, Object)>,
}

impl PdfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page with one text line per entry.
    pub fn page<S: AsRef<str>>(mut self, lines: &[S]) -> Self {
        self.pages
            .push(lines.iter().map(|l| l.as_ref().to_string()).collect());
        self
    }

    /// Append a page with no text at all.
    pub fn empty_page(mut self) -> Self {
        self.pages.push(Vec::new());
        self
    }

    /// Set an `Info` dictionary entry (`Title`, `Author`, ...).
    pub fn info(mut self, key: &str, value: &str) -> Self {
        self.info
            .push((key.to_string(), Object::string_literal(value)));
        self
    }

    /// Set an `Info` entry encoded as UTF-16BE with a byte order mark.
    pub fn info_utf16(mut self, key: &str, value: &str) -> Self {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        self.info
            .push((key.to_string(), Object::String(bytes, StringFormat::Hexadecimal)));
        self
    }

    /// The fixture as an in-memory `lopdf` document.
    pub fn document(&self) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for lines in &self.pages {
            let mut operations = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                let y = 760 - (i as i64) * 14;
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
                operations.push(Operation::new("Td", vec![40.into(), y.into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode fixture content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if !self.info.is_empty() {
            let mut info = lopdf::Dictionary::new();
            for (key, value) in &self.info {
                info.set(key.as_bytes().to_vec(), value.clone());
            }
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }
        doc
    }

    /// Serialized PDF bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut doc = self.document();
        let mut out = Vec::new();
        doc.save_to(&mut out).expect("serialize fixture pdf");
        out
    }

    /// Write the fixture to `dir/name` and return the path.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(&path, self.build()).expect("write fixture pdf");
        path
    }
}

/// A short paper with front matter, an abstract, a table and references.
pub fn sample_paper() -> PdfFixture {
    PdfFixture::new()
        .info("Title", "Consensus Under Load")
        .info("Author", "J. Doe")
        .info("Producer", "folio-test-utils")
        .page(&[
            "Consensus Under Load",
            "J. Doe, Example University",
            "Abstract",
            "We measure throughput of three consensus protocols.",
            "Latency grows with validator count.",
        ])
        .page(&[
            "Results",
            "Chain    TPS    Finality",
            "Alpha    120    2s",
            "Beta     45     12s",
            "Throughput drops beyond 100 validators.",
        ])
        .page(&["References", "[1] Lamport 1998", "[2] Castro 1999"])
}

/// Bytes that start like a PDF but are not one.
pub fn corrupt_pdf_bytes() -> Vec<u8> {
    b"%PDF-1.5\nthis is not a pdf body\n%%EOF".to_vec()
}

/// A JSON paper index in the shape the batch runner reads.
pub fn paper_index(entries: &[(&str, Option<&Path>)]) -> String {
    let papers: Vec<serde_json::Value> = entries
        .iter()
        .map(|(title, path)| {
            serde_json::json!({
                "title": title,
                "authors": ["A. Author"],
                "year": 2021,
                "university": "Example University",
                "file_path": path.map(|p| p.display().to_string()),
                "file_found": path.is_some(),
            })
        })
        .collect();
    serde_json::Value::Array(papers).to_string()
}
