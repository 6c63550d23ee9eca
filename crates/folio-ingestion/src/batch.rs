//! Bounded-concurrency batch extraction.
//!
//! Each document is read, optionally stored in the blob store, then
//! extracted on the blocking pool under a per-document timeout. A document
//! that fails, panics or times out still produces a failure record, so the
//! output always has one entry per input, in input order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use folio_db::{BlobAttributes, BlobStore, PutOutcome};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::error::{IngestError, Result};
use crate::models::{ExtractionRecord, ExtractionWarning, PaperMetadata, PaperRecord};
use crate::pipeline::{failure_record, file_name, Extractor};

// ── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Documents extracted at the same time.
    pub workers: usize,
    pub document_timeout: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: 3,
            document_timeout: Duration::from_secs(300),
        }
    }
}

// ── Inputs and outputs ───────────────────────────────────────────────────────

/// One document to process, with the index entry it came from if any.
#[derive(Debug, Clone)]
pub struct DocumentJob {
    pub path: PathBuf,
    pub paper: Option<PaperMetadata>,
}

impl DocumentJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            paper: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub record: ExtractionRecord,
    pub warnings: Vec<ExtractionWarning>,
    /// Set when the document's bytes were stored (or found) in the blob store.
    pub blob: Option<PutOutcome>,
    pub timed_out: bool,
}

/// Per-run counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub page_warnings: usize,
    pub table_warnings: usize,
    pub blobs_stored: usize,
    pub blobs_reused: usize,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: &[DocumentOutcome]) -> Self {
        let mut report = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            if outcome.record.is_success() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            if outcome.timed_out {
                report.timed_out += 1;
            }
            for warning in &outcome.warnings {
                match warning {
                    ExtractionWarning::Page { .. } => report.page_warnings += 1,
                    ExtractionWarning::Table { .. } => report.table_warnings += 1,
                }
            }
            match &outcome.blob {
                Some(put) if put.was_new => report.blobs_stored += 1,
                Some(_) => report.blobs_reused += 1,
                None => {}
            }
        }
        report
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

pub struct BatchRunner {
    extractor: Extractor,
    store: Option<Arc<dyn BlobStore>>,
    options: BatchOptions,
    /// One permit per worker. A permit is held until the blocking extraction
    /// ends, even after its document has timed out.
    workers: Arc<Semaphore>,
}

impl BatchRunner {
    pub fn new(extractor: Extractor, options: BatchOptions) -> Self {
        Self {
            extractor,
            store: None,
            workers: Arc::new(Semaphore::new(options.workers.max(1))),
            options,
        }
    }

    /// Workers not currently busy with an extraction.
    pub fn idle_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// Store every document's bytes before extracting it.
    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Process all jobs. Returns one outcome per job, in job order.
    pub async fn run(&self, jobs: Vec<DocumentJob>) -> (Vec<DocumentOutcome>, BatchReport) {
        let workers = self.options.workers.max(1);
        let started = Instant::now();
        info!(
            documents = jobs.len(),
            workers,
            timeout_secs = self.options.document_timeout.as_secs(),
            store = self.store.as_ref().map(|s| s.name()).unwrap_or("none"),
            "Starting batch extraction"
        );

        let futures = jobs.into_iter().map(|job| async move {
            let permit = match self.workers.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let err = IngestError::Configuration("worker pool closed".to_string());
                    return self.failure(job.path, &err, false);
                }
            };
            self.process(job, permit).await
        });
        let outcomes = join_all(futures).await;

        let report = BatchReport::from_outcomes(&outcomes);
        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            timed_out = report.timed_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch extraction finished"
        );
        (outcomes, report)
    }

    /// Process every PDF under `dir`.
    pub async fn run_directory(&self, dir: &Path) -> (Vec<DocumentOutcome>, BatchReport) {
        let jobs = discover_pdfs(dir).into_iter().map(DocumentJob::new).collect();
        self.run(jobs).await
    }

    /// Process the papers of an index. Papers without a local file are kept
    /// in the output with no content.
    pub async fn process_papers(&self, papers: Vec<PaperMetadata>) -> (Vec<PaperRecord>, BatchReport) {
        let jobs: Vec<DocumentJob> = papers
            .iter()
            .filter_map(|paper| {
                paper.pdf_path().map(|path| DocumentJob {
                    path,
                    paper: Some(paper.clone()),
                })
            })
            .collect();
        let (outcomes, report) = self.run(jobs).await;

        let mut outcomes = outcomes.into_iter();
        let records = papers
            .into_iter()
            .map(|paper| {
                let outcome = match paper.pdf_path() {
                    Some(_) => outcomes.next(),
                    None => None,
                };
                let pdf_content = outcome.map(|o| o.record);
                PaperRecord {
                    content_extracted: pdf_content.as_ref().is_some_and(ExtractionRecord::is_success),
                    pdf_content,
                    paper,
                    content_extraction_timestamp: Utc::now(),
                }
            })
            .collect();
        (records, report)
    }

    async fn process(&self, job: DocumentJob, permit: OwnedSemaphorePermit) -> DocumentOutcome {
        let DocumentJob { path, paper } = job;
        let started = Instant::now();

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => return self.failure(path.clone(), &IngestError::unreadable(&path, e), false),
        };

        let blob = match &self.store {
            Some(store) => self.store_blob(store.as_ref(), &path, &bytes, paper.as_ref()).await,
            None => None,
        };

        let extractor = self.extractor.clone();
        let task_path = path.clone();
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            extractor.extract_bytes(&task_path, &bytes)
        });

        let limit = self.options.document_timeout;
        let mut outcome = match timeout(limit, task).await {
            Ok(Ok(extraction)) => DocumentOutcome {
                path,
                record: extraction.record,
                warnings: extraction.warnings,
                blob: None,
                timed_out: false,
            },
            Ok(Err(join_err)) => self.failure(path, &IngestError::Join(join_err), false),
            Err(_) => {
                error!(
                    file = %file_name(&path),
                    limit_secs = limit.as_secs_f64(),
                    "Extraction timed out"
                );
                let err = IngestError::Timeout {
                    path: path.clone(),
                    secs: limit.as_secs(),
                };
                self.failure(path, &err, true)
            }
        };
        outcome.blob = blob;

        let elapsed = started.elapsed();
        if elapsed.as_secs() > 60 {
            warn!(file = %file_name(&outcome.path), secs = elapsed.as_secs_f64(), "Slow extraction");
        }
        outcome
    }

    async fn store_blob(
        &self,
        store: &dyn BlobStore,
        path: &Path,
        bytes: &[u8],
        paper: Option<&PaperMetadata>,
    ) -> Option<PutOutcome> {
        let mut attrs = BlobAttributes::for_file(path);
        if let Some(paper) = paper {
            attrs = attrs
                .with_extra("title", paper.title.clone())
                .with_extra("authors", paper.authors.clone())
                .with_extra("year", paper.year.clone())
                .with_extra("university", paper.university.clone())
                .with_extra("journal", paper.journal.clone())
                .with_extra("doi", paper.doi.clone());
        }
        match store.put(bytes, attrs).await {
            Ok(put) => {
                debug!(file = %file_name(path), blob = %put.id, new = put.was_new, "Document stored");
                Some(put)
            }
            Err(e) => {
                warn!(file = %file_name(path), error = %e, "Blob storage failed, continuing with extraction");
                None
            }
        }
    }

    fn failure(&self, path: PathBuf, err: &IngestError, timed_out: bool) -> DocumentOutcome {
        DocumentOutcome {
            record: failure_record(&path, err),
            path,
            warnings: Vec::new(),
            blob: None,
            timed_out,
        }
    }
}

// ── Filesystem helpers ───────────────────────────────────────────────────────

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Every `.pdf` file under `dir`, sorted by path.
pub fn discover_pdfs(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    debug!(dir = %dir.display(), count = found.len(), "Discovered PDFs");
    found
}

/// Read a JSON array of papers.
pub fn load_paper_index(path: &Path) -> Result<Vec<PaperMetadata>> {
    let raw = std::fs::read_to_string(path)?;
    let papers: Vec<PaperMetadata> = serde_json::from_str(&raw)?;
    info!(index = %path.display(), papers = papers.len(), "Paper index loaded");
    Ok(papers)
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_db::MemoryBlobStore;
    use folio_test_utils::{corrupt_pdf_bytes, sample_paper, PdfFixture};
    use tempfile::tempdir;

    fn runner(workers: usize) -> BatchRunner {
        BatchRunner::new(
            Extractor::default(),
            BatchOptions {
                workers,
                document_timeout: Duration::from_secs(30),
            },
        )
    }

    #[tokio::test]
    async fn test_one_outcome_per_job_in_order() {
        let dir = tempdir().unwrap();
        let good = sample_paper().write_to(dir.path(), "a_good.pdf");
        let bad = dir.path().join("b_bad.pdf");
        std::fs::write(&bad, corrupt_pdf_bytes()).unwrap();
        let missing = dir.path().join("c_missing.pdf");

        let (outcomes, report) = runner(2)
            .run(vec![
                DocumentJob::new(&good),
                DocumentJob::new(&bad),
                DocumentJob::new(&missing),
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].path, good);
        assert!(outcomes[0].record.is_success());
        assert!(!outcomes[1].record.is_success());
        assert!(!outcomes[2].record.is_success());
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.timed_out, 0);
    }

    #[tokio::test]
    async fn test_duplicate_files_share_blob() {
        let dir = tempdir().unwrap();
        let fixture = sample_paper();
        fixture.write_to(dir.path(), "one.pdf");
        fixture.write_to(dir.path(), "nested/two.pdf");

        let store = Arc::new(MemoryBlobStore::new());
        let (outcomes, report) = runner(1)
            .with_store(store.clone())
            .run_directory(dir.path())
            .await;

        assert_eq!(outcomes.len(), 2);
        let ids: Vec<_> = outcomes.iter().map(|o| o.blob.as_ref().unwrap().id.clone()).collect();
        assert_eq!(ids[0], ids[1]);
        assert_eq!(report.blobs_stored, 1);
        assert_eq!(report.blobs_reused, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_timeout_yields_failure_record() {
        let dir = tempdir().unwrap();
        let mut fixture = PdfFixture::new();
        let lines: Vec<String> = (0..40).map(|i| format!("Line {i} of a long page with words.")).collect();
        for _ in 0..300 {
            fixture = fixture.page(&lines);
        }
        let path = fixture.write_to(dir.path(), "huge.pdf");

        let runner = BatchRunner::new(
            Extractor::default(),
            BatchOptions {
                workers: 1,
                document_timeout: Duration::from_nanos(1),
            },
        );
        let (outcomes, report) = runner.run(vec![DocumentJob::new(&path)]).await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].timed_out);
        assert!(!outcomes[0].record.is_success());
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_timed_out_extraction_keeps_its_worker() {
        let dir = tempdir().unwrap();
        let mut fixture = PdfFixture::new();
        let lines: Vec<String> = (0..40).map(|i| format!("Line {i} of a long page with words.")).collect();
        for _ in 0..300 {
            fixture = fixture.page(&lines);
        }
        let path = fixture.write_to(dir.path(), "huge.pdf");

        let runner = BatchRunner::new(
            Extractor::default(),
            BatchOptions {
                workers: 1,
                document_timeout: Duration::from_nanos(1),
            },
        );
        let (outcomes, _) = runner.run(vec![DocumentJob::new(&path)]).await;
        assert!(outcomes[0].timed_out);
        assert_eq!(runner.idle_workers(), 0);

        let waited = timeout(Duration::from_secs(60), async {
            while runner.idle_workers() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok());
        assert_eq!(runner.idle_workers(), 1);
    }

    #[test]
    fn test_report_counts_warnings_by_kind() {
        let outcome = DocumentOutcome {
            path: PathBuf::from("partial.pdf"),
            record: failure_record(
                Path::new("partial.pdf"),
                &IngestError::Configuration("unused".into()),
            ),
            warnings: vec![
                ExtractionWarning::Page {
                    page_number: 2,
                    reason: "text extraction failed".into(),
                },
                ExtractionWarning::Table {
                    page_number: 2,
                    reason: "page text unavailable".into(),
                },
            ],
            blob: None,
            timed_out: false,
        };
        let report = BatchReport::from_outcomes(&[outcome]);
        assert_eq!(report.page_warnings, 1);
        assert_eq!(report.table_warnings, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_process_papers_keeps_papers_without_files() {
        let dir = tempdir().unwrap();
        let path = sample_paper().write_to(dir.path(), "consensus_under_load.pdf");
        let index = folio_test_utils::paper_index(&[
            ("Consensus Under Load", Some(&path)),
            ("A Paper Nobody Downloaded", None),
        ]);
        let papers: Vec<PaperMetadata> = serde_json::from_str(&index).unwrap();

        let (records, report) = runner(2).process_papers(papers).await;

        assert_eq!(records.len(), 2);
        assert!(records[0].content_extracted);
        assert!(records[0].pdf_content.is_some());
        assert!(!records[1].content_extracted);
        assert!(records[1].pdf_content.is_none());
        assert_eq!(report.total, 1);

        let value = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(value["title"], "Consensus Under Load");
        assert_eq!(value["year"], "2021");
        assert_eq!(value["pdf_content"]["summary"]["extraction_success"], true);
    }

    #[test]
    fn test_discover_pdfs_filters_and_sorts() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("MIT")).unwrap();
        std::fs::write(dir.path().join("MIT/b.PDF"), b"x").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let found = discover_pdfs(dir.path());
        assert_eq!(found, vec![dir.path().join("MIT/b.PDF"), dir.path().join("a.pdf")]);
    }

    #[test]
    fn test_write_json_creates_parents() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("processed/papers.json");
        write_json(&out, &vec![1, 2, 3]).unwrap();
        let back: Vec<i32> = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }
}
