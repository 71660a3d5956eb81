//! Relative path labels for structure nodes
//!
//! Labels are derived from node titles: lowercase, every run of
//! non-alphanumeric characters replaced by one underscore, leading and
//! trailing underscores trimmed. Empty labels fall back to `<kind>_<n>` where
//! `n` is the node's 1-based position among its siblings.

use crate::structure::{NodeId, NodeKind, StructureTree};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Sanitize a title into a path label; `None` when nothing usable remains
pub fn sanitize_label(title: &str) -> Option<String> {
    let mut label = String::with_capacity(title.len());
    let mut pending_underscore = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_underscore && !label.is_empty() {
                label.push('_');
            }
            pending_underscore = false;
            label.push(c);
        } else {
            pending_underscore = true;
        }
    }

    (!label.is_empty()).then_some(label)
}

/// Label with the positional fallback applied
pub fn node_label(title: Option<&str>, kind: NodeKind, position: usize) -> String {
    title
        .and_then(sanitize_label)
        .unwrap_or_else(|| format!("{}_{}", kind.as_str(), position))
}

/// Output directory names for a batch of documents, one per source, in order.
/// Repeated labels get a `_2`, `_3`, ... suffix.
pub fn document_labels<'a>(sources: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    sources
        .into_iter()
        .enumerate()
        .map(|(i, source)| {
            let stem = Path::new(source)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let base = sanitize_label(&stem).unwrap_or_else(|| format!("document_{}", i + 1));
            claim_unique(&mut taken, base)
        })
        .collect()
}

/// `base` if unused, else the first free `base_2`, `base_3`, ...; the
/// returned label is recorded as taken
fn claim_unique(taken: &mut HashSet<String>, base: String) -> String {
    let mut label = base.clone();
    let mut n = 1;
    while taken.contains(&label) {
        n += 1;
        label = format!("{}_{}", base, n);
    }
    taken.insert(label.clone());
    label
}

/// Path labels for every node of one tree
#[derive(Debug, Clone, Default)]
pub struct NodePaths {
    paths: HashMap<NodeId, String>,
}

impl NodePaths {
    /// Implicit parts add no path segment. Paths that collide get a `_2`,
    /// `_3`, ... suffix so no two nodes share a directory.
    pub fn for_tree(tree: &StructureTree) -> Self {
        let mut paths = HashMap::new();
        let mut taken = HashSet::new();
        paths.insert(tree.root(), String::new());

        for id in tree.walk() {
            let parent_path = paths.get(&id).cloned().unwrap_or_default();

            for (i, child) in tree.node(id).children.iter().enumerate() {
                let node = tree.node(*child);
                if node.implicit {
                    paths.insert(*child, parent_path.clone());
                    continue;
                }

                let label = node_label(node.title.as_deref(), node.kind, i + 1);
                let base = if parent_path.is_empty() {
                    label
                } else {
                    format!("{}/{}", parent_path, label)
                };

                paths.insert(*child, claim_unique(&mut taken, base));
            }
        }

        Self { paths }
    }

    /// Path of `id`; the document root is the empty path
    pub fn path(&self, id: NodeId) -> &str {
        self.paths.get(&id).map(String::as_str).unwrap_or_default()
    }
}
