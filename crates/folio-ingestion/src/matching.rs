//! Paper title to file name matching.
//!
//! Downloaded PDFs are named after their titles with words joined by
//! underscores, but rarely verbatim. A title matches a file when enough of
//! its words appear among the file stem's underscore-separated parts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

fn title_words(title: &str) -> HashSet<String> {
    let stripped: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().map(str::to_string).collect()
}

/// Words shared between `title` and the file name needed for a match.
fn required_overlap(title_word_count: usize) -> usize {
    (title_word_count / 2).min(3).max(1)
}

/// Whether `filename` plausibly holds the paper called `title`.
pub fn title_matches_file(title: &str, filename: &str) -> bool {
    let title = title.trim();
    if title.is_empty() || title.eq_ignore_ascii_case("nan") {
        return false;
    }
    let words = title_words(title);

    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let file_words: HashSet<&str> = stem.split('_').collect();

    let common = words.iter().filter(|w| file_words.contains(w.as_str())).count();
    common >= required_overlap(words.len())
}

fn search(root: &Path, title: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().find(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| title_matches_file(title, name))
    })
}

/// Find the PDF for a paper under `publications_dir`, looking in the
/// university's own sub-directory first.
pub fn find_pdf_file(title: &str, university: Option<&str>, publications_dir: &Path) -> Option<PathBuf> {
    if let Some(university) = university.filter(|u| !u.is_empty()) {
        let dir = publications_dir.join(university);
        if dir.is_dir() {
            if let Some(found) = search(&dir, title) {
                debug!(title, file = %found.display(), "Matched in university directory");
                return Some(found);
            }
        }
    }
    let found = search(publications_dir, title);
    if let Some(ref path) = found {
        debug!(title, file = %path.display(), "Matched in publications tree");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_underscore_filename_matches() {
        assert!(title_matches_file(
            "Consensus Protocols: A Survey of Byzantine Fault Tolerance",
            "byzantine_fault_tolerance_survey.pdf"
        ));
    }

    #[test]
    fn test_unrelated_filename_does_not_match() {
        assert!(!title_matches_file(
            "Consensus Protocols: A Survey of Byzantine Fault Tolerance",
            "tokenomics_of_defi_lending.pdf"
        ));
    }

    #[test]
    fn test_short_title_needs_one_word() {
        assert!(title_matches_file("Sharding", "sharding.pdf"));
        assert!(!title_matches_file("Sharding", "rollups.pdf"));
    }

    #[test]
    fn test_empty_or_nan_title_never_matches() {
        assert!(!title_matches_file("", "anything.pdf"));
        assert!(!title_matches_file("nan", "nan.pdf"));
    }

    #[test]
    fn test_university_directory_searched_first() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Aaa")).unwrap();
        std::fs::create_dir_all(dir.path().join("MIT")).unwrap();
        std::fs::write(dir.path().join("Aaa/staking_rewards_model.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("MIT/staking_rewards_model.pdf"), b"x").unwrap();

        let title = "A Model of Staking Rewards";
        let found = find_pdf_file(title, Some("MIT"), dir.path()).unwrap();
        assert!(found.starts_with(dir.path().join("MIT")));

        let fallback = find_pdf_file(title, Some("Nowhere"), dir.path()).unwrap();
        assert!(fallback.starts_with(dir.path().join("Aaa")));
        assert!(find_pdf_file("Unrelated Title Entirely", None, dir.path()).is_none());
    }
}
