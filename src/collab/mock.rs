use serde_json::{Value, json};

use crate::collab::datagen::{DataGenerationRequest, DataGenerator};
use crate::collab::oracle::{RankingOracle, RankingRequest};
use crate::collab::popup::{PopupDetector, PopupRequest};
use crate::guidance::error::CollaboratorError;

// ============================================================================
// Canned backends (tests and offline runs)
// ============================================================================

/// Popup detector that always answers with the same body.
pub struct MockPopupDetector {
    pub response: Value,
}

impl MockPopupDetector {
    /// A detector that reports a clear screen.
    pub fn clear() -> Self {
        Self {
            response: json!({
                "status": "success",
                "agent_response": { "popup_detection": false }
            }),
        }
    }

    /// A detector that reports a popup closed by the given element.
    pub fn detected(element_metadata: Value) -> Self {
        Self {
            response: json!({
                "status": "success",
                "agent_response": {
                    "popup_detection": true,
                    "element_metadata": element_metadata
                }
            }),
        }
    }
}

impl PopupDetector for MockPopupDetector {
    fn detect(&self, _request: &PopupRequest<'_>) -> Result<Value, CollaboratorError> {
        Ok(self.response.clone())
    }
}

/// Oracle with a canned text answer; `None` behaves like an unreachable oracle.
pub struct MockOracle {
    pub response: Option<String>,
}

impl MockOracle {
    pub fn answering(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
        }
    }

    pub fn unavailable() -> Self {
        Self { response: None }
    }
}

impl RankingOracle for MockOracle {
    fn rank(&self, _request: &RankingRequest<'_>) -> Result<String, CollaboratorError> {
        self.response
            .clone()
            .ok_or(CollaboratorError::NotConfigured {
                collaborator: "mock ranking oracle",
            })
    }
}

pub struct MockDataGenerator {
    pub response: Value,
}

impl MockDataGenerator {
    pub fn not_required() -> Self {
        Self {
            response: json!({
                "status": "success",
                "agent_response": { "data_generation_required": false, "fields": [] }
            }),
        }
    }

    pub fn with_fields(fields: Value) -> Self {
        Self {
            response: json!({
                "status": "success",
                "agent_response": { "data_generation_required": true, "fields": fields }
            }),
        }
    }
}

impl DataGenerator for MockDataGenerator {
    fn generate(&self, _request: &DataGenerationRequest<'_>) -> Result<Value, CollaboratorError> {
        Ok(self.response.clone())
    }
}

// ============================================================================
// Unconfigured collaborator
// ============================================================================

/// Stand-in for a collaborator without an endpoint; every call fails so the
/// feature degrades.
pub struct Unconfigured {
    pub collaborator: &'static str,
}

impl Unconfigured {
    pub fn new(collaborator: &'static str) -> Self {
        Self { collaborator }
    }

    fn fail<T>(&self) -> Result<T, CollaboratorError> {
        Err(CollaboratorError::NotConfigured {
            collaborator: self.collaborator,
        })
    }
}

impl PopupDetector for Unconfigured {
    fn detect(&self, _request: &PopupRequest<'_>) -> Result<Value, CollaboratorError> {
        self.fail()
    }
}

impl RankingOracle for Unconfigured {
    fn rank(&self, _request: &RankingRequest<'_>) -> Result<String, CollaboratorError> {
        self.fail()
    }
}

impl DataGenerator for Unconfigured {
    fn generate(&self, _request: &DataGenerationRequest<'_>) -> Result<Value, CollaboratorError> {
        self.fail()
    }
}
