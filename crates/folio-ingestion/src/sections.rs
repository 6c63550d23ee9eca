//! Keyword-driven section segmentation.
//!
//! No layout analysis: a line is a heading when it contains (or, for the
//! stricter segmenter, starts with) a catalog keyword. A keyword inside an
//! ordinary sentence ("in summary, ...") is read as a heading by
//! `KeywordSegmenter`; that is a known limitation of the heuristic.

use crate::models::{SectionKind, SectionMap};

/// Section catalog in match priority order. The first entry with a matching
/// keyword wins.
pub const SECTION_CATALOG: &[(SectionKind, &[&str])] = &[
    (SectionKind::Abstract,     &["abstract", "summary"]),
    (SectionKind::Introduction, &["introduction", "intro"]),
    (SectionKind::Methods,      &["methods", "methodology", "materials and methods"]),
    (SectionKind::Results,      &["results", "findings"]),
    (SectionKind::Discussion,   &["discussion", "conclusion"]),
    (SectionKind::References,   &["references", "bibliography", "citations"]),
    (SectionKind::Appendix,     &["appendix", "appendices"]),
];

/// Splits line-structured text into named sections.
pub trait Segmenter: Send + Sync {
    /// Section kind this line switches to, if it is a heading.
    fn heading_kind(&self, line: &str) -> Option<SectionKind>;

    fn name(&self) -> &'static str;

    /// Walk the lines, switching section on every heading. Body text is
    /// appended to the current section; heading lines themselves are
    /// consumed.
    fn segment(&self, text: &str) -> SectionMap {
        let mut sections = SectionMap::new();
        let mut current = SectionKind::Unknown;
        let mut buffer: Vec<&str> = Vec::new();

        for line in text.lines() {
            match self.heading_kind(line) {
                Some(kind) => {
                    flush(&mut sections, current, &buffer);
                    buffer.clear();
                    current = kind;
                    sections.ensure(kind);
                }
                None => buffer.push(line),
            }
        }
        flush(&mut sections, current, &buffer);
        sections
    }
}

fn flush(sections: &mut SectionMap, kind: SectionKind, buffer: &[&str]) {
    let joined = buffer.join("\n");
    let body = joined.trim();
    // `unknown` only exists when something came before the first heading.
    if kind == SectionKind::Unknown && body.is_empty() {
        return;
    }
    sections.append(kind, body);
}

fn catalog_match(line: &str, matches: impl Fn(&str, &str) -> bool) -> Option<SectionKind> {
    SECTION_CATALOG
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| matches(line, kw)))
        .map(|(kind, _)| *kind)
}

/// Substring matcher: any line containing a keyword is a heading.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSegmenter;

impl Segmenter for KeywordSegmenter {
    fn heading_kind(&self, line: &str) -> Option<SectionKind> {
        let lower = line.trim().to_lowercase();
        catalog_match(&lower, |l, kw| l.contains(kw))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Stricter matcher: only short lines that begin with a keyword, after any
/// leading section numbering ("2.", "3.1 ").
#[derive(Debug, Clone, Copy)]
pub struct HeadingSegmenter {
    pub max_words: usize,
}

impl Default for HeadingSegmenter {
    fn default() -> Self {
        Self { max_words: 8 }
    }
}

impl Segmenter for HeadingSegmenter {
    fn heading_kind(&self, line: &str) -> Option<SectionKind> {
        let lower = line.trim().to_lowercase();
        let words = lower.split_whitespace().count();
        if words == 0 || words > self.max_words {
            return None;
        }
        let stripped = lower.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c.is_whitespace());
        catalog_match(stripped, |l, kw| l.starts_with(kw))
    }

    fn name(&self) -> &'static str {
        "heading"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAPER: &str = "Abstract\n\
        We study staking.\n\
        Rewards are modelled.\n\
        Simulations agree.\n\
        References\n\
        [1] Nakamoto 2008\n\
        [2] Buterin 2014";

    #[test]
    fn test_abstract_and_references_split() {
        let sections = KeywordSegmenter.segment(PAPER);
        assert_eq!(
            sections.get(SectionKind::Abstract),
            Some("We study staking.\nRewards are modelled.\nSimulations agree.")
        );
        assert_eq!(
            sections.get(SectionKind::References),
            Some("[1] Nakamoto 2008\n[2] Buterin 2014")
        );
        assert!(!sections.contains(SectionKind::Unknown));
    }

    #[test]
    fn test_preamble_lands_in_unknown() {
        let sections = KeywordSegmenter.segment("A Title\nJ. Doe\nIntroduction\nBody");
        assert_eq!(sections.get(SectionKind::Unknown), Some("A Title\nJ. Doe"));
        assert_eq!(sections.get(SectionKind::Introduction), Some("Body"));
        let order: Vec<_> = sections.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec![SectionKind::Unknown, SectionKind::Introduction]);
    }

    #[test]
    fn test_catalog_order_breaks_ties() {
        // "results" is declared before "discussion".
        assert_eq!(
            KeywordSegmenter.heading_kind("Results and Discussion"),
            Some(SectionKind::Results)
        );
    }

    #[test]
    fn test_recurring_section_accumulates() {
        let sections = KeywordSegmenter.segment("Methods\nfirst\nResults\nr\nMethods\nsecond");
        assert_eq!(sections.get(SectionKind::Methods), Some("first\nsecond"));
    }

    #[test]
    fn test_heading_with_no_body_is_present_and_empty() {
        let sections = KeywordSegmenter.segment("Body text\nAppendix");
        assert_eq!(sections.get(SectionKind::Appendix), Some(""));
    }

    #[test]
    fn test_keyword_inside_sentence_splits_with_substring_matcher() {
        let text = "Introduction\nWe begin.\nIn summary, staking works.\nMore intro text.";
        let sections = KeywordSegmenter.segment(text);
        assert_eq!(sections.get(SectionKind::Introduction), Some("We begin."));
        // "More intro text." also contains "intro", so it is a heading too.
        assert_eq!(sections.get(SectionKind::Abstract), Some(""));
    }

    #[test]
    fn test_heading_segmenter_ignores_sentences() {
        let text = "1. Introduction\nWe begin.\nIn summary, staking works well for validators on most networks today.\n2.1 Methods\nWe ran it.";
        let sections = HeadingSegmenter::default().segment(text);
        assert_eq!(
            sections.get(SectionKind::Introduction),
            Some("We begin.\nIn summary, staking works well for validators on most networks today.")
        );
        assert_eq!(sections.get(SectionKind::Methods), Some("We ran it."));
        assert!(!sections.contains(SectionKind::Abstract));
    }

    #[test]
    fn test_empty_text_has_no_sections() {
        assert!(KeywordSegmenter.segment("").is_empty());
    }
}
