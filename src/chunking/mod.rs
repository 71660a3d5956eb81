//! Paragraph assembly and size-bounded chunk packing
//!
//! A node's body fragments become [`ParagraphUnit`]s, which are packed into
//! [`Chunk`]s no longer than `max_chunk_size` characters. Oversized paragraphs
//! fall back to sentence, then word, then hard character splits.

mod packer;
mod paragraph;
mod splitter;

pub use packer::ChunkPacker;
pub use paragraph::{PARAGRAPH_SEPARATOR, PageSpan, ParagraphAssembler, ParagraphUnit, join_paragraphs};
pub use splitter::{SentenceSplitter, char_len, split_words};

use serde::{Deserialize, Serialize};

/// A size-bounded slice of a node's paragraph text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Overlap prefix (if any) followed by the chunk's own text
    pub content: String,
    /// 0-indexed position within the owning node
    pub sequence: usize,
    pub char_count: usize,
    /// Pages the chunk's own text came from, ascending
    pub pages: Vec<u32>,
    /// Path label of the owning node
    pub node_path: String,
    /// Titles of the owning node and its ancestors, outermost first
    pub heading_path: Vec<String>,
    /// Leading characters copied from the previous chunk
    pub overlap_chars: usize,
    /// Source text between the previous chunk's text and this one's
    pub separator_before: String,
}

/// Owning node identity copied onto each chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkOrigin {
    pub node_path: String,
    pub heading_path: Vec<String>,
}

/// Rebuild a node's assembled text from its chunks by dropping overlap
/// prefixes and restoring separators
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    for chunk in chunks {
        text.push_str(&chunk.separator_before);
        text.extend(chunk.content.chars().skip(chunk.overlap_chars));
    }
    text
}

/// Size statistics over a set of chunks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_characters: usize,
    pub avg_chunk_size: f64,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
}

impl ChunkingStats {
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        let sizes: Vec<usize> = chunks.into_iter().map(|c| c.char_count).collect();
        if sizes.is_empty() {
            return Self::default();
        }

        let total_characters: usize = sizes.iter().sum();
        Self {
            total_chunks: sizes.len(),
            total_characters,
            avg_chunk_size: total_characters as f64 / sizes.len() as f64,
            min_chunk_size: sizes.iter().copied().min().unwrap_or(0),
            max_chunk_size: sizes.iter().copied().max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, sequence: usize, overlap_chars: usize, separator: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            sequence,
            char_count: content.chars().count(),
            pages: vec![1],
            node_path: String::new(),
            heading_path: Vec::new(),
            overlap_chars,
            separator_before: separator.to_string(),
        }
    }

    #[test]
    fn test_reconstruct_drops_overlap() {
        let chunks = vec![
            chunk("Hello world.", 0, 0, ""),
            chunk("world.Next part", 1, 6, " "),
        ];
        assert_eq!(reconstruct(&chunks), "Hello world. Next part");
    }

    #[test]
    fn test_stats() {
        let chunks = vec![chunk("abcd", 0, 0, ""), chunk("ab", 1, 0, "\n\n")];
        let stats = ChunkingStats::from_chunks(&chunks);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_characters, 6);
        assert_eq!(stats.min_chunk_size, 2);
        assert_eq!(stats.max_chunk_size, 4);
        assert!((stats.avg_chunk_size - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_empty() {
        let stats = ChunkingStats::from_chunks(Vec::<Chunk>::new().iter());
        assert_eq!(stats, ChunkingStats::default());
    }
}
