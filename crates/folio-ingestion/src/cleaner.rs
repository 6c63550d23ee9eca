//! Whitespace and artifact normalisation for extracted text.

/// Normalise extracted text into a single line.
///
/// NUL bytes are dropped, form feeds and vertical tabs become spaces,
/// typographic quotes and en/em dashes become their ASCII forms, and every
/// whitespace run (newlines included) collapses to one space. Idempotent.
pub fn clean(text: &str) -> String {
    let mapped: String = text
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| match c {
            '\u{0c}' | '\u{0b}' => ' ',
            '\u{201c}' | '\u{201d}' | '\u{201e}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201a}' => '\'',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean each line on its own, keeping the line structure. Section
/// segmentation needs the newlines that `clean` removes.
pub fn clean_lines(text: &str) -> String {
    text.lines().map(clean).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_collapses_whitespace_and_newlines() {
        assert_eq!(clean("  a\n\n b\t\tc  "), "a b c");
    }

    #[test]
    fn test_strips_pdf_artifacts() {
        assert_eq!(clean("page\u{0c}break\u{0b}here\0!"), "page break here!");
    }

    #[test]
    fn test_normalises_quotes_and_dashes() {
        assert_eq!(
            clean("\u{201c}proof\u{201d} \u{2018}of\u{2019} stake \u{2013} and \u{2014} work"),
            "\"proof\" 'of' stake - and - work"
        );
    }

    #[test]
    fn test_nul_between_spaces_does_not_leave_double_space() {
        assert_eq!(clean("a \0 b"), "a b");
    }

    #[test]
    fn test_empty_stays_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(clean(" \n\u{0c} "), "");
    }

    #[test]
    fn test_clean_lines_keeps_line_breaks() {
        assert_eq!(clean_lines("Abstract  \n  two   words\n"), "Abstract\ntwo words");
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(s in "\\PC*") {
            let once = clean(&s);
            prop_assert_eq!(clean(&once), once.clone());
        }

        #[test]
        fn prop_clean_has_no_runs_or_edges(s in "[ a-z\\n\\t\u{0c}\u{2014}\u{201c}]{0,200}") {
            let out = clean(&s);
            prop_assert!(!out.contains("  "));
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
            prop_assert!(!out.contains('\n'));
        }
    }
}
