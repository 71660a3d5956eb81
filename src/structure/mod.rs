//! Structural classification of the fragment stream
//!
//! Every fragment gets exactly one [`Role`](crate::types::Role) from a strict
//! priority cascade: crop region (header/footer), bookmarks, layout
//! heuristics, heading patterns, then body text. Heading fragments open nodes
//! of the [`StructureTree`] and body fragments attach to the deepest open node.

mod bookmarks;
mod classifier;
mod heuristics;
mod layout;
mod patterns;
mod tree;

pub use bookmarks::normalize_title;
pub use classifier::Classifier;
pub use heuristics::LayoutProfile;
pub use layout::{CropRegion, PageGeometry};
pub use patterns::HeadingMatcher;
pub use tree::{NodeId, NodeKind, NodeSpec, StructureNode, StructureTree};

use crate::config::PipelineConfig;
use crate::types::{Bookmark, ClassifiedFragment, Fragment};
use serde::{Deserialize, Serialize};

/// Ambiguity noticed during classification; logged, never fatal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureWarning {
    #[error("Malformed bookmarks ignored: {reason}")]
    MalformedBookmarks { reason: String },

    #[error("Bold and regular heading candidates share font size {font_size}pt; bold ranks higher")]
    FontSizeTie { font_size: f64 },

    #[error("Heading pattern '{pattern}' is invalid, pattern tier disabled: {reason}")]
    PatternTierDisabled { pattern: String, reason: String },
}

/// Counts reported by classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStats {
    pub parts_found: usize,
    pub implicit_parts: usize,
    pub chapters_found: usize,
    pub sections_found: usize,
    pub headers: usize,
    pub footers: usize,
    pub body_fragments: usize,
    pub by_bookmark: usize,
    pub by_heuristic: usize,
    pub by_regex: usize,
}

/// Result of one classification pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub classified: Vec<ClassifiedFragment>,
    pub tree: StructureTree,
    pub warnings: Vec<StructureWarning>,
    pub stats: StructureStats,
}

/// Classify `fragments` with a one-off [`Classifier`]
pub fn classify(
    fragments: &[Fragment],
    bookmarks: &[Bookmark],
    geometry: &PageGeometry,
    config: &PipelineConfig,
) -> Classification {
    Classifier::new(config).classify(fragments, bookmarks, geometry)
}
