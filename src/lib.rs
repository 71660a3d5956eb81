//! # PDF RAG Chunker - Structure-aware chunking of extracted PDF text
//!
//! Turns the positioned text fragments an extraction engine produces for a PDF
//! into a Part / Chapter / Section tree and packs each node's body text into
//! size-bounded chunks ready for retrieval-augmented generation.
//!
//! ## Overview
//!
//! Every fragment receives exactly one role from a priority cascade: a page
//! crop region marks headers and footers, bookmarks mark headings they can be
//! matched to, layout heuristics score the remaining fragments, and heading
//! patterns catch the rest. Body text is grouped into paragraphs and packed
//! greedily into chunks that never exceed `max_chunk_size` characters,
//! falling back to sentence, word and finally character splits for oversized
//! paragraphs.
//!
//! ## Architecture
//!
//! ```text
//! fragment stream (JSON)
//!          |
//!    NoiseFilter          drop page numbers, blank and excluded lines
//!          |
//!    Classifier           crop -> bookmarks -> heuristics -> patterns -> body
//!          |
//!    StructureTree        Document > Part > Chapter > Section
//!          |
//!    ParagraphAssembler   vertical gaps and page-break policy
//!          |
//!    ChunkPacker          greedy packing with overlap
//!          |
//!    OutputWriter         chunk files, metadata.json, index.json
//! ```
//!
//! ## Modules
//!
//! - [`types`]: Fragment stream and classification types
//! - [`config`]: Configuration with file loading and environment overrides
//! - [`input`]: Loading and validating fragment streams
//! - [`filter`]: Noise removal and section exclusion
//! - [`structure`]: Role classification and the structure tree
//! - [`chunking`]: Paragraph assembly and chunk packing
//! - [`pipeline`]: Per-document orchestration and batch processing
//! - [`output`]: Manifest construction and persistence
//! - [`paths`]: Path labels for nodes and documents
//! - [`error`]: Error types
//!
//! ## Usage Example
//!
//! ```no_run
//! use pdf_rag_chunker::config::PipelineConfig;
//! use pdf_rag_chunker::input::load_document;
//! use pdf_rag_chunker::pipeline::DocumentPipeline;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let pipeline = DocumentPipeline::new(PipelineConfig::default())?;
//!     let input = load_document(Path::new("book.json"))?;
//!     let doc = pipeline.process(&input)?;
//!
//!     for chunk in doc.chunks() {
//!         println!("{} [{}]: {} chars", chunk.node_path, chunk.sequence, chunk.char_count);
//!     }
//!     Ok(())
//! }
//! ```

/// Paragraph assembly and size-bounded chunk packing
pub mod chunking;

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// Noise filtering and excluded-section pruning
pub mod filter;

/// Fragment stream loading and validation
pub mod input;

/// Manifest construction and persistence of chunks
pub mod output;

/// Path labels for structure nodes and documents
pub mod paths;

/// Per-document orchestration and concurrent batch processing
pub mod pipeline;

/// Role classification and structure tree construction
pub mod structure;

/// Fragment stream and classification types with JSON schema
pub mod types;
