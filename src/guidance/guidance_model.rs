use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::candidate::candidate_model::Candidate;
use crate::tree::bounds::Bounds;
use crate::tree::tree_model::{Attributes, NodeId};

// ============================================================================
// Request
// ============================================================================

/// One guidance request: a screen plus everything known about the journey.
#[derive(Debug, Clone, Default)]
pub struct GuidanceRequest {
    pub request_id: String,
    pub document: String,
    pub document_url: Option<String>,
    /// Base64 screenshot.
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub user_prompt: String,
    pub history: Vec<Value>,
    /// Passed through to the test data generator.
    pub config: Map<String, Value>,
}

impl GuidanceRequest {
    pub fn new(request_id: &str, document: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            document: document.to_string(),
            ..Default::default()
        }
    }
}

/// Fresh request id (UUID v4, hex without dashes).
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// ============================================================================
// Ranked actions
// ============================================================================

/// One entry of the output list. `rank` is 1-based; lower acts first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAction {
    /// `None` for actions that do not come from the tree (popup close).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub rank: usize,
    pub description: String,
    pub heuristic_score: i32,
    pub bounds: Bounds,
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_data: Option<Value>,
}

impl RankedAction {
    pub fn from_candidate(candidate: &Candidate, rank: usize) -> Self {
        Self {
            node_id: Some(candidate.node_id),
            rank,
            description: candidate.description.clone(),
            heuristic_score: candidate.heuristic_score,
            bounds: candidate.bounds,
            attributes: candidate.attributes.clone(),
            generated_data: None,
        }
    }
}

/// How the final order was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    /// A popup must be closed first.
    Popup,
    Oracle,
    /// Top-to-bottom, left-to-right, used when the oracle is unavailable.
    ReadingOrder,
    /// Nothing on the screen can be acted upon.
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceOutcome {
    pub ranked_actions: Vec<RankedAction>,
    pub explanation: String,
    pub strategy: RankingStrategy,
}

// ============================================================================
// Response envelope
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GuidanceResponse {
    pub request_id: String,
    pub status: String,
    pub agent_response: AgentResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub ranked_actions: Vec<RankedAction>,
    pub explanation: String,
}

impl GuidanceResponse {
    pub fn success(request_id: &str, outcome: GuidanceOutcome) -> Self {
        Self {
            request_id: request_id.to_string(),
            status: "success".to_string(),
            agent_response: AgentResponse {
                ranked_actions: outcome.ranked_actions,
                explanation: outcome.explanation,
            },
        }
    }
}
