//! Arena-backed structure tree
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. The
//! parent link is a plain index used for lookups while reporting; ownership
//! flows strictly from the arena.

use crate::types::{DetectionSource, HeadingLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Handle of a node inside its [`StructureTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Kind of document division a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Document,
    Part,
    Chapter,
    Section,
}

impl NodeKind {
    pub fn depth(self) -> usize {
        match self {
            NodeKind::Document => 0,
            NodeKind::Part => 1,
            NodeKind::Chapter => 2,
            NodeKind::Section => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Part => "part",
            NodeKind::Chapter => "chapter",
            NodeKind::Section => "section",
        }
    }
}

impl From<HeadingLevel> for NodeKind {
    fn from(level: HeadingLevel) -> Self {
        match level {
            HeadingLevel::Part => NodeKind::Part,
            HeadingLevel::Chapter => NodeKind::Chapter,
            HeadingLevel::Section => NodeKind::Section,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub title: Option<String>,
    /// Fragment consumed as this node's heading
    pub heading: Option<usize>,
    /// Tier that opened the node; `None` for the root and implicit parts
    pub source: Option<DetectionSource>,
    /// Created to hold chapters that appear before any part
    pub implicit: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Direct body fragments, in stream order
    pub body: Vec<usize>,
    /// Pages the heading and direct body fragments came from
    pub pages: BTreeSet<u32>,
    /// Inclusive page range declared by a bookmark
    pub page_range: Option<(u32, u32)>,
}

impl StructureNode {
    fn new(id: NodeId, kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            id,
            kind,
            title: None,
            heading: None,
            source: None,
            implicit: false,
            parent,
            children: Vec::new(),
            body: Vec::new(),
            pages: BTreeSet::new(),
            page_range: None,
        }
    }
}

/// Description of a node to open during assembly
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub title: Option<String>,
    pub heading: Option<usize>,
    pub source: Option<DetectionSource>,
    pub page_range: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureTree {
    nodes: Vec<StructureNode>,
}

impl Default for StructureTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureTree {
    /// A tree holding only the document root
    pub fn new() -> Self {
        Self {
            nodes: vec![StructureNode::new(NodeId(0), NodeKind::Document, None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &StructureNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[StructureNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].body.is_empty()
    }

    /// Append a child under `parent` and return its id
    pub fn add_child(&mut self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = StructureNode::new(id, spec.kind, Some(parent));
        node.title = spec.title;
        node.heading = spec.heading;
        node.source = spec.source;
        node.page_range = spec.page_range;
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn mark_implicit(&mut self, id: NodeId) {
        self.nodes[id.0].implicit = true;
    }

    pub(crate) fn attach_body(&mut self, id: NodeId, fragment: usize, page: u32) {
        let node = &mut self.nodes[id.0];
        node.body.push(fragment);
        node.pages.insert(page);
    }

    pub(crate) fn record_page(&mut self, id: NodeId, page: u32) {
        self.nodes[id.0].pages.insert(page);
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |current| self.node(*current).parent)
    }

    /// Nearest enclosing node (or `id` itself) of the given kind
    pub fn enclosing(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| self.node(*candidate).kind == kind)
    }

    /// Depth-first pre-order traversal from the root
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    /// Count of nodes of a given kind
    pub fn count(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    /// A new tree without the subtrees whose root satisfies `exclude`.
    /// The document root is never removed.
    pub fn pruned<F>(&self, mut exclude: F) -> StructureTree
    where
        F: FnMut(&StructureNode) -> bool,
    {
        let mut pruned = StructureTree::new();
        {
            let root = &mut pruned.nodes[0];
            let original = self.node(self.root());
            root.body = original.body.clone();
            root.pages = original.pages.clone();
        }

        let mut stack: Vec<(NodeId, NodeId)> = self
            .node(self.root())
            .children
            .iter()
            .rev()
            .map(|child| (*child, pruned.root()))
            .collect();

        while let Some((old_id, new_parent)) = stack.pop() {
            let old = self.node(old_id);
            if exclude(old) {
                tracing::debug!(
                    "Pruning {} '{}'",
                    old.kind.as_str(),
                    old.title.as_deref().unwrap_or_default()
                );
                continue;
            }

            let new_id = pruned.add_child(
                new_parent,
                NodeSpec {
                    kind: old.kind,
                    title: old.title.clone(),
                    heading: old.heading,
                    source: old.source,
                    page_range: old.page_range,
                },
            );
            let node = &mut pruned.nodes[new_id.0];
            node.implicit = old.implicit;
            node.body = old.body.clone();
            node.pages = old.pages.clone();

            stack.extend(old.children.iter().rev().map(|child| (*child, new_id)));
        }

        pruned
    }
}
