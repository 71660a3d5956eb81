use crate::chunking::ChunkingStats;
use crate::filter::FilterStats;
use crate::pipeline::{ChunkedDocument, ChunkedNode};
use crate::structure::{NodeKind, StructureStats, StructureWarning};
use serde::{Deserialize, Serialize};

/// Root-level summary of one processed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentManifest {
    pub source: String,
    pub source_digest: String,
    pub library: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub total_chunks: usize,
    pub total_characters: usize,
    pub total_nodes: usize,
    pub nodes: ManifestNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestNode {
    pub kind: NodeKind,
    pub title: Option<String>,
    pub path: String,
    pub chunk_count: usize,
    pub char_count: usize,
    pub pages: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ManifestNode>,
}

/// Per-phase statistics and warnings for one processed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub source: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_error: Option<String>,
    pub filter: FilterStats,
    pub structure: StructureStats,
    pub chunking: ChunkingStats,
    pub warnings: Vec<StructureWarning>,
}

impl ManifestNode {
    /// Number of nodes in this subtree, itself included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ManifestNode::node_count).sum::<usize>()
    }
}

impl ChunkedDocument {
    /// Summarize the document for the index file
    pub fn manifest(&self) -> DocumentManifest {
        DocumentManifest {
            source: self.source.clone(),
            source_digest: self.source_digest.clone(),
            library: self.library.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_chunks: self.total_chunks(),
            total_characters: self.total_characters(),
            total_nodes: self.nodes.len(),
            nodes: manifest_node(&self.nodes, 0),
        }
    }

    /// Filtering, classification and chunking results for `report.json`
    pub fn report(&self) -> ProcessingReport {
        ProcessingReport {
            source: self.source.clone(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            input_error: self.input_error.clone(),
            filter: self.filter_stats.clone(),
            structure: self.structure_stats.clone(),
            chunking: self.chunking_stats.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

fn manifest_node(nodes: &[ChunkedNode], index: usize) -> ManifestNode {
    let node = &nodes[index];
    ManifestNode {
        kind: node.kind,
        title: node.title.clone(),
        path: node.path.clone(),
        chunk_count: node.chunk_count(),
        char_count: node.char_count(),
        pages: node.pages.clone(),
        children: node
            .children
            .iter()
            .map(|child| manifest_node(nodes, *child))
            .collect(),
    }
}
