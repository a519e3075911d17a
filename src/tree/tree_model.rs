use std::collections::BTreeMap;

use serde::Serialize;

use crate::tree::bounds::Bounds;

pub type NodeId = usize;

/// String-keyed attribute map, ordered so serialized output is stable.
pub type Attributes = BTreeMap<String, String>;

/// Attributes that must all be `"true"` for an element to be acted upon.
pub const INTERACTABLE_FLAGS: [&str; 3] = ["clickable", "enabled", "displayed"];

// ============================================================================
// Node
// ============================================================================

/// One element of the UI hierarchy.
///
/// `raw_attributes` holds the attributes exactly as found in the document.
/// `attributes` holds the normalized keys (`content-desc` becomes
/// `content_desc`), the element `tag`, and whatever was inherited from the
/// parent during enrichment. `description`, `heuristic_score` and `path` are
/// derived from `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub tag: String,
    pub raw_attributes: Attributes,
    pub attributes: Attributes,
    pub description: String,
    pub heuristic_score: i32,
    pub path: String,
}

impl Node {
    /// Attribute value, or `""` when absent.
    pub fn attr(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::parse_or_default(self.attr("bounds"))
    }

    pub fn is_interactable(&self) -> bool {
        is_interactable(&self.attributes)
    }
}

pub fn is_interactable(attributes: &Attributes) -> bool {
    INTERACTABLE_FLAGS
        .iter()
        .all(|flag| attributes.get(*flag).is_some_and(|v| v == "true"))
}

// ============================================================================
// UiTree
// ============================================================================

/// One parsed UI hierarchy document.
///
/// Node ids are assigned in pre-order starting at 0, so `nodes[id]` is the
/// node with that id and the vector order is the traversal order.
#[derive(Debug, Clone, Serialize)]
pub struct UiTree {
    nodes: Vec<Node>,
    children: Vec<Vec<NodeId>>,
    #[serde(skip)]
    parents: Vec<Option<NodeId>>,
}

impl UiTree {
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        children: Vec<Vec<NodeId>>,
        parents: Vec<Option<NodeId>>,
    ) -> Self {
        Self {
            nodes,
            children,
            parents,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id).copied().flatten()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `None` when the id is not part of this tree.
    pub fn is_leaf(&self, id: NodeId) -> Option<bool> {
        self.children.get(id).map(Vec::is_empty)
    }
}
