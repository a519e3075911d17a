use tracing::warn;

use crate::candidate::candidate_model::Candidate;
use crate::guidance::error::FilterError;
use crate::tree::tree_model::{Node, UiTree};

/// Select the elements worth ranking.
///
/// Uses the strict rule (interactable leaves) and drops to the relaxed rule
/// only when the strict one cannot be evaluated.
pub fn filter_candidates(tree: &UiTree, elements: &[Node]) -> Vec<Candidate> {
    match strict_candidates(tree, elements) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(error = %e, "strict candidate rule failed; using relaxed selection");
            relaxed_candidates(elements)
        }
    }
}

/// Interactable (`clickable`, `enabled`, `displayed` all `"true"`) leaf nodes.
pub fn strict_candidates(tree: &UiTree, elements: &[Node]) -> Result<Vec<Candidate>, FilterError> {
    let mut candidates = Vec::new();

    for node in elements {
        let is_leaf = tree
            .is_leaf(node.id)
            .ok_or(FilterError::UnknownNode(node.id))?;

        if is_leaf && node.is_interactable() {
            candidates.push(Candidate::from_node(node));
        }
    }

    Ok(candidates)
}

/// Positive heuristic score, or fully interactable. No leaf restriction.
pub fn relaxed_candidates(elements: &[Node]) -> Vec<Candidate> {
    elements
        .iter()
        .filter(|node| node.heuristic_score > 0 || node.is_interactable())
        .map(Candidate::from_node)
        .collect()
}
