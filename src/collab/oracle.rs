use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::candidate::candidate_model::Candidate;
use crate::guidance::error::CollaboratorError;
use crate::tree::tree_model::NodeId;

// ============================================================================
// Ranking oracle contract
// ============================================================================

/// Candidate as the oracle sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleCandidate {
    pub node_id: NodeId,
    pub description: String,
    pub element_type: String,
    pub bounds: String,
}

impl From<&Candidate> for OracleCandidate {
    fn from(candidate: &Candidate) -> Self {
        Self {
            node_id: candidate.node_id,
            description: candidate.description.clone(),
            element_type: candidate.element_type.clone(),
            bounds: candidate.bounds.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingRequest<'a> {
    pub request_id: &'a str,
    pub screen_context: &'a str,
    pub image: Option<&'a str>,
    pub candidates: Vec<OracleCandidate>,
    pub history: &'a [Value],
    pub user_prompt: &'a str,
}

pub trait RankingOracle: Send + Sync {
    /// Raw text answer of the oracle.
    fn rank(&self, request: &RankingRequest<'_>) -> Result<String, CollaboratorError>;
}

/// Parsed oracle answer: node ids from most to least important.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRanking {
    pub node_ids: Vec<NodeId>,
    pub explanation: String,
}

/// Drop a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        body = body.strip_suffix("```").unwrap_or(body);
    }
    body.trim()
}

/// Parse `{"ranked_actions": [...], "explanation": "..."}`.
///
/// Ids may be integers or numeric strings; other entries are skipped.
pub fn parse_ranking_response(raw: &str) -> Result<OracleRanking, CollaboratorError> {
    let body = strip_code_fences(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::Payload(format!("oracle answer is not JSON: {}", e)))?;

    let ranked = value
        .get("ranked_actions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            CollaboratorError::Payload("oracle answer has no ranked_actions list".to_string())
        })?;

    let node_ids = ranked
        .iter()
        .filter_map(|entry| match entry {
            Value::Number(n) => n.as_u64().map(|id| id as NodeId),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect();

    let explanation = value
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Ok(OracleRanking {
        node_ids,
        explanation,
    })
}

// ============================================================================
// Ollama backend
// ============================================================================

pub struct OllamaOracle {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaOracle {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:1.5b".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<&'a str>>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaOracle {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    pub fn build_prompt(request: &RankingRequest<'_>) -> String {
        let candidates = serde_json::to_string_pretty(&request.candidates)
            .unwrap_or_else(|_| "[]".to_string());
        let history = serde_json::to_string(request.history).unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"You are exploring a mobile app. Order the actionable elements of the current screen so that following the order completes meaningful user journeys.

SCREEN CONTEXT: {context}

ACTIONABLE ELEMENTS:
{candidates}

PREVIOUS ACTIONS: {history}

USER INTENT: {intent}

Rules:
- Never act on ads or elements that leave the app.
- Deprioritize actions that lead to loops.
- When several actions belong to one journey (fill username, fill password, tick a checkbox, press login), rank them in the order they must be performed.

Respond with ONLY valid JSON: {{"ranked_actions": [node_id, ...], "explanation": "..."}}"#,
            context = if request.screen_context.is_empty() {
                "(none)"
            } else {
                request.screen_context
            },
            candidates = candidates,
            history = history,
            intent = if request.user_prompt.is_empty() {
                "(none)"
            } else {
                request.user_prompt
            },
        )
    }
}

impl RankingOracle for OllamaOracle {
    fn rank(&self, request: &RankingRequest<'_>) -> Result<String, CollaboratorError> {
        let body = OllamaRequest {
            model: &self.model,
            prompt: Self::build_prompt(request),
            stream: false,
            format: "json",
            images: request.image.map(|image| vec![image]),
        };

        let transport = |source: reqwest::Error| CollaboratorError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;

        let response = client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .map_err(|e| CollaboratorError::Payload(format!("{}: {}", self.endpoint, e)))?;
        Ok(ollama_response.response)
    }
}
