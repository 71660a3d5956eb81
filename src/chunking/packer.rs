use super::paragraph::{PageSpan, ParagraphUnit, join_paragraphs};
use super::splitter::{SentenceSplitter, advance_chars, char_len, split_words};
use super::{Chunk, ChunkOrigin};
use crate::config::ChunkingConfig;
use crate::error::{ChunkerError, ChunkingError, ConfigError};
use std::collections::BTreeSet;
use std::ops::Range;

/// Unit size a piece was produced at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Paragraph,
    Sentence,
    Word,
}

/// Greedy packer with sentence, word and hard-cut fallbacks
pub struct ChunkPacker {
    max_chunk_size: usize,
    chunk_overlap: usize,
    continuation_budget: usize,
    split_by_paragraph: bool,
    split_by_sentence: bool,
    split_by_word: bool,
    sentences: SentenceSplitter,
}

/// Buffer state while packing one node
struct PackState<'a> {
    text: &'a str,
    max_chunk_size: usize,
    continuation_budget: usize,
    buffer: Option<Range<usize>>,
    buffer_chars: usize,
    done: Vec<Range<usize>>,
}

impl<'a> PackState<'a> {
    /// Room for new content: the full size for the first chunk, minus the
    /// overlap prefix for every later one
    fn budget(&self) -> usize {
        if self.done.is_empty() {
            self.max_chunk_size
        } else {
            self.continuation_budget
        }
    }

    fn try_append(&mut self, piece: &Range<usize>) -> bool {
        let budget = self.budget();
        let piece_chars = char_len(&self.text[piece.clone()]);

        match &mut self.buffer {
            None if piece_chars <= budget => {
                self.buffer = Some(piece.clone());
                self.buffer_chars = piece_chars;
                true
            }
            None => false,
            Some(buffer) => {
                let separator = char_len(&self.text[buffer.end..piece.start]);
                let total = self.buffer_chars + separator + piece_chars;
                if total <= budget {
                    buffer.end = piece.end;
                    self.buffer_chars = total;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.done.push(buffer);
            self.buffer_chars = 0;
        }
    }

    /// Cut at character boundaries; the last window stays open for the
    /// pieces that follow
    fn hard_cut(&mut self, piece: Range<usize>) {
        tracing::debug!(
            "Hard cut of a {} character unit",
            char_len(&self.text[piece.clone()])
        );
        let mut start = piece.start;
        while start < piece.end {
            self.flush();
            let end = advance_chars(self.text, start, piece.end, self.budget());
            self.buffer = Some(start..end);
            self.buffer_chars = char_len(&self.text[start..end]);
            start = end;
        }
    }
}

impl ChunkPacker {
    pub fn new(config: &ChunkingConfig) -> Result<Self, ChunkerError> {
        if config.max_chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize("max_chunk_size must be positive".into()).into());
        }
        if config.chunk_overlap >= config.max_chunk_size {
            return Err(ChunkingError::InvalidChunkSize(format!(
                "chunk_overlap ({}) must be smaller than max_chunk_size ({})",
                config.chunk_overlap, config.max_chunk_size
            ))
            .into());
        }

        let sentences = SentenceSplitter::new(&config.sentence_boundary_pattern).map_err(|e| {
            ConfigError::InvalidPattern {
                key: "chunking.sentence_boundary_pattern".to_string(),
                pattern: config.sentence_boundary_pattern.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            max_chunk_size: config.max_chunk_size,
            chunk_overlap: config.chunk_overlap,
            continuation_budget: config.continuation_budget(),
            split_by_paragraph: config.split_by_paragraph,
            split_by_sentence: config.split_by_sentence,
            split_by_word: config.split_by_word,
            sentences,
        })
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Pack one node's paragraphs. Sequence numbers start at 0 for every node.
    ///
    /// Fails without returning any chunk when a chunk would exceed the size
    /// limit, so a node's chunk list is never partially emitted.
    pub fn pack(
        &self,
        paragraphs: &[ParagraphUnit],
        origin: &ChunkOrigin,
    ) -> Result<Vec<Chunk>, ChunkingError> {
        if paragraphs.is_empty() {
            return Ok(Vec::new());
        }

        let (text, spans) = join_paragraphs(paragraphs);
        let units: Vec<Range<usize>> = if self.split_by_paragraph {
            let mut offset = 0;
            paragraphs
                .iter()
                .map(|p| {
                    let range = offset..offset + p.text.len();
                    offset = range.end + super::PARAGRAPH_SEPARATOR.len();
                    range
                })
                .collect()
        } else {
            vec![0..text.len()]
        };

        let mut state = PackState {
            text: &text,
            max_chunk_size: self.max_chunk_size,
            continuation_budget: self.continuation_budget,
            buffer: None,
            buffer_chars: 0,
            done: Vec::new(),
        };
        for unit in units {
            self.admit(&mut state, unit, Granularity::Paragraph);
        }
        state.flush();

        let chunks = self.build_chunks(&text, &spans, &state.done, origin);
        self.verify(&chunks, origin)?;
        Ok(chunks)
    }

    fn admit(&self, state: &mut PackState<'_>, piece: Range<usize>, granularity: Granularity) {
        if piece.is_empty() || state.try_append(&piece) {
            return;
        }
        state.flush();
        if state.try_append(&piece) {
            return;
        }

        match granularity {
            Granularity::Paragraph if self.split_by_sentence => {
                for sentence in self.sentences.split(state.text, piece) {
                    self.admit(state, sentence, Granularity::Sentence);
                }
            }
            Granularity::Paragraph | Granularity::Sentence if self.split_by_word => {
                for word in split_words(state.text, piece) {
                    self.admit(state, word, Granularity::Word);
                }
            }
            _ => state.hard_cut(piece),
        }
    }

    fn build_chunks(
        &self,
        text: &str,
        spans: &[PageSpan],
        ranges: &[Range<usize>],
        origin: &ChunkOrigin,
    ) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::with_capacity(ranges.len());
        let mut previous_end = 0;

        for (sequence, range) in ranges.iter().enumerate() {
            let (prefix, overlap_chars) = match chunks.last() {
                Some(previous) if self.chunk_overlap > 0 => {
                    let prefix = tail_chars(&previous.content, self.chunk_overlap);
                    let count = char_len(prefix);
                    (prefix.to_string(), count)
                }
                _ => (String::new(), 0),
            };

            let mut content = prefix;
            content.push_str(&text[range.clone()]);

            let pages: BTreeSet<u32> = spans
                .iter()
                .filter(|span| span.start < range.end && span.end > range.start)
                .map(|span| span.page)
                .collect();

            chunks.push(Chunk {
                char_count: char_len(&content),
                content,
                sequence,
                pages: pages.into_iter().collect(),
                node_path: origin.node_path.clone(),
                heading_path: origin.heading_path.clone(),
                overlap_chars,
                separator_before: text[previous_end..range.start].to_string(),
            });
            previous_end = range.end;
        }

        chunks
    }

    fn verify(&self, chunks: &[Chunk], origin: &ChunkOrigin) -> Result<(), ChunkingError> {
        for chunk in chunks {
            if chunk.char_count > self.max_chunk_size {
                tracing::error!(
                    "Chunk {} of '{}' has {} characters, limit is {}",
                    chunk.sequence,
                    origin.node_path,
                    chunk.char_count,
                    self.max_chunk_size
                );
                return Err(ChunkingError::SizeInvariantViolation {
                    node: origin.node_path.clone(),
                    sequence: chunk.sequence,
                    size: chunk.char_count,
                    max: self.max_chunk_size,
                });
            }
        }
        Ok(())
    }
}

/// Last `n` characters of `text` (all of it when shorter)
fn tail_chars(text: &str, n: usize) -> &str {
    let total = char_len(text);
    if total <= n {
        return text;
    }
    let start = text
        .char_indices()
        .nth(total - n)
        .map(|(offset, _)| offset)
        .unwrap_or(0);
    &text[start..]
}
