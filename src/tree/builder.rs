use crate::guidance::error::GuidanceError;
use crate::score::heuristic::heuristic_score;
use crate::tree::tree_model::{Attributes, Node, NodeId, UiTree};

/// Textual fields a node borrows from its parent when its own value is empty.
pub const INHERITED_TEXT_FIELDS: [&str; 3] = ["content_desc", "resource_id", "text"];

/// Boolean fields a parent can switch on for its child (`"false"` -> `"true"`).
pub const INHERITED_BOOLEAN_FIELDS: [&str; 10] = [
    "clickable",
    "checkable",
    "checked",
    "enabled",
    "focusable",
    "focused",
    "long_clickable",
    "displayed",
    "scrollable",
    "selected",
];

/// Parse a UI hierarchy document into an enriched `UiTree`.
pub fn build_tree(document: &str) -> Result<UiTree, GuidanceError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(document, options)?;

    let mut nodes: Vec<Node> = Vec::new();
    let mut children: Vec<Vec<NodeId>> = Vec::new();
    let mut parents: Vec<Option<NodeId>> = Vec::new();

    // Explicit pre-order walk; the next id is always `nodes.len()`.
    let mut stack = vec![(doc.root_element(), None::<NodeId>)];
    while let Some((element, parent)) = stack.pop() {
        let id = nodes.len();
        nodes.push(read_element(id, &element));
        children.push(Vec::new());
        parents.push(parent);
        if let Some(parent_id) = parent {
            children[parent_id].push(id);
        }

        let element_children: Vec<_> = element.children().filter(|c| c.is_element()).collect();
        for child in element_children.into_iter().rev() {
            stack.push((child, Some(id)));
        }
    }

    inherit_from_parent(&mut nodes, |id| parents.get(id).copied().flatten());
    for node in nodes.iter_mut() {
        refresh_derived(node);
    }
    assign_paths(&mut nodes, &children, &parents);

    Ok(UiTree::from_parts(nodes, children, parents))
}

fn read_element(id: NodeId, element: &roxmltree::Node) -> Node {
    let tag = element.tag_name().name().to_string();

    let raw_attributes: Attributes = element
        .attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect();

    let mut attributes: Attributes = raw_attributes
        .iter()
        .map(|(k, v)| (normalize_key(k), v.clone()))
        .collect();
    attributes.insert("tag".to_string(), tag.clone());

    let mut node = Node {
        id,
        tag,
        raw_attributes,
        attributes,
        description: String::new(),
        heuristic_score: 0,
        path: String::new(),
    };
    refresh_derived(&mut node);
    node
}

/// `content-desc` -> `content_desc`, `long-clickable` -> `long_clickable`.
pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
}

/// Text plus accessibility description, or the resource id when both are empty.
pub fn describe(attributes: &Attributes) -> String {
    let get = |k: &str| attributes.get(k).map(String::as_str).unwrap_or("");
    let description = format!("{} {}", get("text"), get("content_desc"))
        .trim()
        .to_string();
    if description.is_empty() {
        get("resource_id").trim().to_string()
    } else {
        description
    }
}

fn refresh_derived(node: &mut Node) {
    node.description = describe(&node.attributes);
    node.heuristic_score = heuristic_score(&node.description, &node.attributes);
}

/// Copy missing text fields and enabling boolean flags from each node's
/// immediate parent. Exactly one level is consulted.
///
/// `nodes` must be in pre-order: a parent is enriched before its children,
/// which makes the pass idempotent.
pub fn inherit_from_parent<F>(nodes: &mut [Node], parent_of: F)
where
    F: Fn(NodeId) -> Option<NodeId>,
{
    for id in 0..nodes.len() {
        let Some(parent_id) = parent_of(id) else {
            continue;
        };
        if parent_id >= id {
            continue;
        }

        let (before, rest) = nodes.split_at_mut(id);
        let parent = &before[parent_id].attributes;
        let node = &mut rest[0].attributes;

        for field in INHERITED_TEXT_FIELDS {
            let missing = node.get(field).is_none_or(|v| v.is_empty());
            if let Some(value) = parent.get(field).filter(|v| !v.is_empty()) {
                if missing {
                    node.insert(field.to_string(), value.clone());
                }
            }
        }

        for field in INHERITED_BOOLEAN_FIELDS {
            let child_false = node.get(field).is_some_and(|v| v == "false");
            let parent_true = parent.get(field).is_some_and(|v| v == "true");
            if child_false && parent_true {
                node.insert(field.to_string(), "true".to_string());
            }
        }
    }
}

fn assign_paths(nodes: &mut [Node], children: &[Vec<NodeId>], parents: &[Option<NodeId>]) {
    for id in 0..nodes.len() {
        let path = match parents[id] {
            Some(parent_id) => {
                let tag = &nodes[id].tag;
                let index = children[parent_id]
                    .iter()
                    .filter(|sibling| nodes[**sibling].tag == *tag)
                    .position(|sibling| *sibling == id)
                    .map(|p| p + 1)
                    .unwrap_or(1);
                format!("{}/{}[{}]", nodes[parent_id].path, tag, index)
            }
            None => format!("/{}", nodes[id].tag),
        };
        nodes[id].path = path;
    }
}
