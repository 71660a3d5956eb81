//! Per-document orchestration and concurrent batch processing
//!
//! One document runs strictly in order: validate, filter, classify, prune
//! excluded sections, assemble paragraphs, pack chunks. Independent documents
//! share nothing mutable and are processed in parallel with rayon.

use crate::chunking::{Chunk, ChunkOrigin, ChunkPacker, ChunkingStats, ParagraphAssembler};
use crate::config::PipelineConfig;
use crate::error::{ChunkerError, InputError};
use crate::filter::{FilterStats, NoiseFilter, prune_excluded_sections};
use crate::input::validate_stream;
use crate::paths::NodePaths;
use crate::structure::{
    Classifier, LayoutProfile, NodeId, NodeKind, PageGeometry, StructureStats, StructureTree,
    StructureWarning,
};
use crate::types::{ClassifiedFragment, DocumentInput, Role};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// One structure node with its packed chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedNode {
    pub kind: NodeKind,
    pub title: Option<String>,
    /// Relative path label; empty for the document root
    pub path: String,
    pub implicit: bool,
    /// Pages of the node's heading and direct body content
    pub pages: Vec<u32>,
    /// Inclusive range declared by a bookmark
    pub page_range: Option<(u32, u32)>,
    pub paragraph_count: usize,
    pub chunks: Vec<Chunk>,
    /// Positions of the child nodes in [`ChunkedDocument::nodes`]
    pub children: Vec<usize>,
}

impl ChunkedNode {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn char_count(&self) -> usize {
        self.chunks.iter().map(|c| c.char_count).sum()
    }
}

/// Everything derived from one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub source: String,
    /// SHA-256 of the input fragment text
    pub source_digest: String,
    pub library: String,
    pub total_pages: u32,
    /// Nodes in tree order; `nodes[0]` is the document root
    pub nodes: Vec<ChunkedNode>,
    pub classified: Vec<ClassifiedFragment>,
    pub warnings: Vec<StructureWarning>,
    /// Set when the input stream was rejected and the document degraded to
    /// an empty root
    pub input_error: Option<String>,
    pub filter_stats: FilterStats,
    pub structure_stats: StructureStats,
    pub chunking_stats: ChunkingStats,
}

impl ChunkedDocument {
    pub fn root(&self) -> &ChunkedNode {
        &self.nodes[0]
    }

    /// Every chunk, node by node in tree order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.nodes.iter().flat_map(|node| node.chunks.iter())
    }

    pub fn total_chunks(&self) -> usize {
        self.nodes.iter().map(ChunkedNode::chunk_count).sum()
    }

    pub fn total_characters(&self) -> usize {
        self.nodes.iter().map(ChunkedNode::char_count).sum()
    }

    /// First node whose title matches, ignoring case
    pub fn find_node(&self, title: &str) -> Option<&ChunkedNode> {
        self.nodes.iter().find(|node| {
            node.title
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(title))
        })
    }
}

pub struct DocumentPipeline {
    config: PipelineConfig,
    filter: NoiseFilter,
    classifier: Classifier,
    packer: ChunkPacker,
    /// Checked between documents only
    cancelled: Option<Arc<AtomicBool>>,
}

impl DocumentPipeline {
    /// Validate the configuration and prepare every stage
    pub fn new(config: PipelineConfig) -> Result<Self, ChunkerError> {
        config.validate()?;

        Ok(Self {
            filter: NoiseFilter::new(&config.cleaning),
            classifier: Classifier::new(&config),
            packer: ChunkPacker::new(&config.chunking)?,
            config,
            cancelled: None,
        })
    }

    /// Set a cancellation flag that is checked before each document starts.
    /// A document already in progress always runs to completion.
    pub fn with_cancellation_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(cancelled);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Classify and chunk one document
    pub fn process(&self, input: &DocumentInput) -> Result<ChunkedDocument, ChunkerError> {
        if self.is_cancelled() {
            tracing::info!("Skipping '{}': processing was cancelled", input.source);
            return Err(ChunkerError::Cancelled(input.source.clone()));
        }

        let start = Instant::now();
        if let Err(e) = validate_stream(input) {
            tracing::warn!("Input for '{}' rejected, emitting an empty document: {}", input.source, e);
            return Ok(self.degraded(input, e));
        }

        let (fragments, filter_stats) = self.filter.apply(&input.fragments);
        let geometry = PageGeometry::from_input(input);
        let classification = self
            .classifier
            .classify(&fragments, &input.bookmarks, &geometry);

        let tree = prune_excluded_sections(&classification.tree, &self.config.cleaning.exclude_sections);
        if tree.len() < classification.tree.len() {
            tracing::info!(
                "Excluded {} nodes matching {:?}",
                classification.tree.len() - tree.len(),
                self.config.cleaning.exclude_sections
            );
        }

        let body_mask: Vec<bool> = classification
            .classified
            .iter()
            .map(|c| c.role == Role::BodyText)
            .collect();
        let body_font_size = LayoutProfile::measure(&fragments, &body_mask).body_font_size;
        let assembler = ParagraphAssembler::new(&self.config.structure).with_body_font_size(body_font_size);

        let paths = NodePaths::for_tree(&tree);
        let mut nodes = Vec::with_capacity(tree.len());
        for node in tree.nodes() {
            let body: Vec<&ClassifiedFragment> = node
                .body
                .iter()
                .map(|index| &classification.classified[*index])
                .collect();
            let paragraphs = assembler.assemble(&body);

            let origin = ChunkOrigin {
                node_path: paths.path(node.id).to_string(),
                heading_path: heading_path(&tree, node.id),
            };
            let chunks = self.packer.pack(&paragraphs, &origin).inspect_err(|e| {
                tracing::error!("Aborting chunk emission for '{}': {}", input.source, e);
            })?;

            nodes.push(ChunkedNode {
                kind: node.kind,
                title: node.title.clone(),
                path: origin.node_path,
                implicit: node.implicit,
                pages: node.pages.iter().copied().collect(),
                page_range: node.page_range,
                paragraph_count: paragraphs.len(),
                chunks,
                children: node.children.iter().map(|child| child.0).collect(),
            });
        }

        let chunking_stats = ChunkingStats::from_chunks(nodes.iter().flat_map(|n| n.chunks.iter()));
        tracing::info!(
            "Processed '{}': {} nodes, {} chunks, {} characters in {}ms",
            input.source,
            nodes.len(),
            chunking_stats.total_chunks,
            chunking_stats.total_characters,
            start.elapsed().as_millis()
        );

        Ok(ChunkedDocument {
            source: input.source.clone(),
            source_digest: source_digest(input),
            library: self.config.extraction.library.clone(),
            total_pages: input.page_count(),
            nodes,
            classified: classification.classified,
            warnings: classification.warnings,
            input_error: None,
            filter_stats,
            structure_stats: classification.stats,
            chunking_stats,
        })
    }

    /// Process documents in parallel; results keep the input order
    pub fn process_batch(&self, inputs: &[DocumentInput]) -> Vec<Result<ChunkedDocument, ChunkerError>> {
        tracing::info!("Processing {} documents", inputs.len());
        inputs.par_iter().map(|input| self.process(input)).collect()
    }

    fn degraded(&self, input: &DocumentInput, error: InputError) -> ChunkedDocument {
        let tree = StructureTree::new();
        let root = tree.node(tree.root());
        ChunkedDocument {
            source: input.source.clone(),
            source_digest: source_digest(input),
            library: self.config.extraction.library.clone(),
            total_pages: input.total_pages,
            nodes: vec![ChunkedNode {
                kind: root.kind,
                title: None,
                path: String::new(),
                implicit: false,
                pages: Vec::new(),
                page_range: None,
                paragraph_count: 0,
                chunks: Vec::new(),
                children: Vec::new(),
            }],
            classified: Vec::new(),
            warnings: Vec::new(),
            input_error: Some(error.to_string()),
            filter_stats: FilterStats::default(),
            structure_stats: StructureStats::default(),
            chunking_stats: ChunkingStats::default(),
        }
    }
}

/// Titles of `id` and its titled ancestors, outermost first
fn heading_path(tree: &StructureTree, id: NodeId) -> Vec<String> {
    let mut titles: Vec<String> = std::iter::once(id)
        .chain(tree.ancestors(id))
        .filter_map(|node| tree.node(node).title.clone())
        .collect();
    titles.reverse();
    titles
}

fn source_digest(input: &DocumentInput) -> String {
    let mut hasher = Sha256::new();
    for fragment in &input.fragments {
        hasher.update(fragment.content.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests;
