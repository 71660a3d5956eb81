//! Fallback splitting of oversized units
//!
//! Every function returns byte ranges into the original text. The gaps
//! between consecutive ranges are the separators, so joining ranges with the
//! text between them reproduces the input exactly.

use regex::Regex;
use std::ops::Range;

/// Number of characters in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset reached by advancing `n` characters from `start`, capped at `limit`
pub fn advance_chars(text: &str, start: usize, limit: usize, n: usize) -> usize {
    text[start..limit]
        .char_indices()
        .nth(n)
        .map(|(offset, _)| start + offset)
        .unwrap_or(limit)
}

/// Splits at a configurable sentence boundary pattern.
///
/// Capture group 1 of the pattern is the separator between two sentences.
/// Without a group 1 the split happens at the end of the match.
pub struct SentenceSplitter {
    boundary: Regex,
}

impl SentenceSplitter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            boundary: Regex::new(pattern)?,
        })
    }

    pub fn split(&self, text: &str, range: Range<usize>) -> Vec<Range<usize>> {
        let slice = &text[range.clone()];
        let mut sentences = Vec::new();
        let mut cursor = 0;

        for caps in self.boundary.captures_iter(slice) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let (sep_start, sep_end) = caps
                .get(1)
                .map(|sep| (sep.start(), sep.end()))
                .unwrap_or((whole.end(), whole.end()));

            if sep_start > cursor {
                sentences.push(range.start + cursor..range.start + sep_start);
            }
            cursor = cursor.max(sep_end);
        }

        if cursor < slice.len() {
            sentences.push(range.start + cursor..range.end);
        }
        sentences
    }
}

/// Split on whitespace runs
pub fn split_words(text: &str, range: Range<usize>) -> Vec<Range<usize>> {
    let slice = &text[range.clone()];
    let mut words = Vec::new();
    let mut word_start: Option<usize> = None;

    for (offset, c) in slice.char_indices() {
        match (c.is_whitespace(), word_start) {
            (true, Some(start)) => {
                words.push(range.start + start..range.start + offset);
                word_start = None;
            }
            (false, None) => word_start = Some(offset),
            _ => {}
        }
    }

    if let Some(start) = word_start {
        words.push(range.start + start..range.end);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;

    fn pieces<'a>(text: &'a str, ranges: &[Range<usize>]) -> Vec<&'a str> {
        ranges.iter().map(|r| &text[r.clone()]).collect()
    }

    fn default_splitter() -> SentenceSplitter {
        SentenceSplitter::new(&ChunkingConfig::default().sentence_boundary_pattern).unwrap()
    }

    #[test]
    fn test_sentence_split_keeps_punctuation() {
        let text = "First one. Second one! Third? yes. Fourth.";
        let ranges = default_splitter().split(text, 0..text.len());
        assert_eq!(
            pieces(text, &ranges),
            vec!["First one.", "Second one!", "Third? yes.", "Fourth."]
        );
    }

    #[test]
    fn test_sentence_split_closing_quote() {
        let text = "He said \"go.\" Then left.";
        let ranges = default_splitter().split(text, 0..text.len());
        assert_eq!(pieces(text, &ranges), vec!["He said \"go.\"", "Then left."]);
    }

    #[test]
    fn test_sentence_split_within_range() {
        let text = "xx A b. C d. yy";
        let ranges = default_splitter().split(text, 3..12);
        assert_eq!(pieces(text, &ranges), vec!["A b.", "C d."]);
    }

    #[test]
    fn test_sentence_split_no_boundary() {
        let text = "no boundary here at all";
        let ranges = default_splitter().split(text, 0..text.len());
        assert_eq!(ranges, vec![0..text.len()]);
    }

    #[test]
    fn test_pattern_without_group() {
        let splitter = SentenceSplitter::new(r";").unwrap();
        let text = "a;b;c";
        let ranges = splitter.split(text, 0..text.len());
        assert_eq!(pieces(text, &ranges), vec!["a;", "b;", "c"]);
    }

    #[test]
    fn test_split_words() {
        let text = "alpha  beta\n\tgamma";
        let ranges = split_words(text, 0..text.len());
        assert_eq!(pieces(text, &ranges), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_advance_chars_multibyte() {
        let text = "héllo wörld";
        let end = advance_chars(text, 0, text.len(), 4);
        assert_eq!(&text[..end], "héll");
        assert_eq!(advance_chars(text, 0, text.len(), 100), text.len());
    }

    #[test]
    fn test_char_len() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(char_len(""), 0);
    }
}
