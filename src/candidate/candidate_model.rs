use serde::Serialize;

use crate::tree::bounds::Bounds;
use crate::tree::tree_model::{Attributes, Node, NodeId};

/// A node selected as eligible for ranking, with a snapshot of what the
/// ranking oracle gets to see.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub node_id: NodeId,
    pub description: String,
    pub heuristic_score: i32,
    pub element_type: String,
    pub bounds: Bounds,
    pub path: String,
    pub attributes: Attributes,
}

impl Candidate {
    pub fn from_node(node: &Node) -> Self {
        let mut attributes = node.attributes.clone();
        attributes.insert("xpath".to_string(), node.path.clone());

        Self {
            node_id: node.id,
            description: node.description.clone(),
            heuristic_score: node.heuristic_score,
            element_type: node.tag.clone(),
            bounds: node.bounds(),
            path: node.path.clone(),
            attributes,
        }
    }
}
