use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use action_prioritizer::collab::datagen::{DataGenerationRequest, DataGenerator};
use action_prioritizer::collab::oracle::{RankingOracle, RankingRequest};
use action_prioritizer::guidance::error::CollaboratorError;
use action_prioritizer::guidance::guidance_model::GuidanceRequest;
use serde_json::Value;

/// Contents of `tests/fixtures/<name>`.
pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

pub fn login_screen() -> String {
    fixture("login_screen.xml")
}

pub fn request(document: &str) -> GuidanceRequest {
    GuidanceRequest::new("test-request", document)
}

/// A clickable, enabled, displayed leaf with the given bounds.
pub fn leaf(tag: &str, text: &str, bounds: &str) -> String {
    format!(
        r#"<{tag} text="{text}" clickable="true" enabled="true" displayed="true" bounds="{bounds}" />"#
    )
}

/// Wrap elements in a `<hierarchy>` root.
pub fn screen(children: &[String]) -> String {
    format!("<hierarchy>{}</hierarchy>", children.join(""))
}

// ============================================================================
// Call-counting collaborators
// ============================================================================

pub struct CountingOracle {
    pub calls: Arc<AtomicUsize>,
    pub response: Option<String>,
}

impl CountingOracle {
    pub fn new(response: Option<&str>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                response: response.map(str::to_string),
            },
            calls,
        )
    }
}

impl RankingOracle for CountingOracle {
    fn rank(&self, _request: &RankingRequest<'_>) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| CollaboratorError::Payload("timed out".to_string()))
    }
}

pub struct CountingDataGenerator {
    pub calls: Arc<AtomicUsize>,
    pub response: Value,
}

impl CountingDataGenerator {
    pub fn new(response: Value) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: calls.clone(),
                response,
            },
            calls,
        )
    }
}

impl DataGenerator for CountingDataGenerator {
    fn generate(&self, _request: &DataGenerationRequest<'_>) -> Result<Value, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Oracle that records the candidate ids it was offered.
pub struct RecordingOracle {
    pub seen: Arc<std::sync::Mutex<Vec<usize>>>,
    pub response: String,
}

impl RankingOracle for RecordingOracle {
    fn rank(&self, request: &RankingRequest<'_>) -> Result<String, CollaboratorError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.extend(request.candidates.iter().map(|c| c.node_id));
        }
        Ok(self.response.clone())
    }
}
