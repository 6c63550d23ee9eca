//! Overlapping, sentence-snapped text chunker.
//!
//! Chunks are character windows over the cleaned full text. A window that
//! does not reach the end of the text is pulled back to just after the last
//! `.`, `!` or `?` within its final stretch, so most chunks end on a sentence
//! boundary. Consecutive windows overlap by `overlap` characters.

use crate::error::{IngestError, Result};
use crate::models::Chunk;

/// How far back from a window's end to look for a sentence terminator.
pub const SENTENCE_LOOKBACK: usize = 100;

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Chunk window configuration. Only constructible in a valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkerConfig {
    /// `chunk_size` must be positive and `overlap` smaller than it, otherwise
    /// the window would never advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(IngestError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(IngestError::Configuration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

fn make_chunk(index: usize, text: String, start_char: usize, end_char: usize) -> Chunk {
    Chunk {
        chunk_id: format!("chunk_{index}"),
        chunk_index: index,
        word_count: text.split_whitespace().count(),
        text,
        start_char,
        end_char,
    }
}

/// Split `text` into chunks. Text no longer than one window (including the
/// empty string) yields exactly one chunk holding all of it.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let size = config.chunk_size;

    if len <= size {
        return vec![make_chunk(1, text.to_string(), 0, len)];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut index = 1;

    while start < len {
        let mut end = (start + size).min(len);

        if end < len {
            // The floor keeps `end - overlap` ahead of `start`.
            let floor = (start + size)
                .saturating_sub(SENTENCE_LOOKBACK)
                .max(start + config.overlap);
            if let Some(p) = (floor + 1..=end).rev().find(|&i| TERMINATORS.contains(&chars[i])) {
                end = p + 1;
            }
        }

        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(make_chunk(index, trimmed.to_string(), start, end));
            index += 1;
        }

        if end == len {
            break;
        }
        start = end - config.overlap;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// `len` characters of filler words with terminators at the given offsets.
    fn text_with_stops(len: usize, stops: &[usize]) -> String {
        (0..len)
            .map(|i| {
                if stops.contains(&i) {
                    '.'
                } else if i % 6 == 5 {
                    ' '
                } else {
                    'x'
                }
            })
            .collect()
    }

    #[test]
    fn test_rejects_overlap_not_below_size() {
        assert!(matches!(
            ChunkerConfig::new(100, 150),
            Err(IngestError::Configuration(_))
        ));
        assert!(ChunkerConfig::new(100, 100).is_err());
        assert!(ChunkerConfig::new(0, 0).is_err());
        assert!(ChunkerConfig::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("A short abstract.", &ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "chunk_1");
        assert_eq!(chunks[0].text, "A short abstract.");
        assert_eq!((chunks[0].start_char, chunks[0].end_char), (0, 17));
        assert_eq!(chunks[0].word_count, 3);
    }

    #[test]
    fn test_empty_text_is_one_empty_chunk() {
        let chunks = chunk_text("", &ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
        assert_eq!(chunks[0].end_char, 0);
        assert_eq!(chunks[0].word_count, 0);
    }

    #[test]
    fn test_2500_chars_gives_three_chunks() {
        let text = text_with_stops(2500, &[990, 1980]);
        let chunks = chunk_text(&text, &ChunkerConfig::default());

        let indices: Vec<_> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        // First window snaps just past the terminator at 990.
        assert_eq!(chunks[0].end_char, 991);
        assert_eq!(chunks[1].start_char, 791);
        // 1980 is outside the second window's lookback, so it ends at full size.
        assert_eq!(chunks[1].end_char, 1791);
        assert_eq!(chunks[2].start_char, 1591);
        assert_eq!(chunks[2].end_char, 2500);
    }

    #[test]
    fn test_second_window_snaps_when_terminator_in_lookback() {
        let text = text_with_stops(2500, &[990, 1750]);
        let chunks = chunk_text(&text, &ChunkerConfig::default());
        assert_eq!(chunks[0].end_char, 991);
        assert_eq!(chunks[1].end_char, 1751);
        assert!(chunks[1].text.ends_with('.'));
        assert_eq!(chunks.last().map(|c| c.end_char), Some(2500));
    }

    #[test]
    fn test_offsets_count_characters_not_bytes() {
        let text = "é".repeat(30);
        let config = ChunkerConfig::new(10, 2).unwrap();
        let chunks = chunk_text(&text, &config);
        assert_eq!(chunks.last().map(|c| c.end_char), Some(30));
        assert!(chunks.iter().all(|c| c.text.chars().count() == c.end_char - c.start_char));
    }

    #[test]
    fn test_large_overlap_with_terminators_still_advances() {
        // Lookback floor would be below start + overlap without the clamp.
        let text = "a. ".repeat(200);
        let config = ChunkerConfig::new(50, 45).unwrap();
        let chunks = chunk_text(&text, &config);
        assert!(chunks.windows(2).all(|w| w[1].start_char > w[0].start_char));
        assert_eq!(chunks.last().map(|c| c.end_char), Some(600));
    }

    proptest! {
        #[test]
        fn prop_spans_cover_text_with_bounded_overlap(
            text in "[a-z.!?]{0,3000}",
            size in 20usize..400,
            overlap_pct in 0usize..90,
        ) {
            let overlap = size * overlap_pct / 100;
            let config = ChunkerConfig::new(size, overlap).unwrap();
            let chars: Vec<char> = text.chars().collect();
            let len = chars.len();
            let chunks = chunk_text(&text, &config);

            prop_assert_eq!(chunks[0].start_char, 0);
            prop_assert_eq!(chunks.last().map(|c| c.end_char), Some(len));
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.chunk_index, i + 1);
                let span: String = chars[c.start_char..c.end_char].iter().collect();
                prop_assert_eq!(&c.text, &span);
            }
            for w in chunks.windows(2) {
                prop_assert!(w[1].start_char > w[0].start_char);
                prop_assert!(w[1].start_char <= w[0].end_char);
                prop_assert!(w[0].end_char - w[1].start_char <= overlap);
            }
        }

        #[test]
        fn prop_cleaned_text_spans_are_contiguous(
            words in proptest::collection::vec("[a-z]{1,12}[.!?]?", 1..400),
            size in 50usize..300,
        ) {
            let text = crate::cleaner::clean(&words.join(" "));
            let overlap = size / 5;
            let config = ChunkerConfig::new(size, overlap).unwrap();
            let len = text.chars().count();
            let chunks = chunk_text(&text, &config);

            prop_assert_eq!(chunks[0].start_char, 0);
            prop_assert_eq!(chunks.last().map(|c| c.end_char), Some(len));
            for w in chunks.windows(2) {
                prop_assert!(w[1].start_char <= w[0].end_char);
                prop_assert!(w[0].end_char - w[1].start_char <= overlap);
            }
        }
    }
}
