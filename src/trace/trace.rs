use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Pipeline stage a trace event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TreeBuilt,
    PopupCheck,
    Ranking,
    DataGeneration,
    Merge,
    Completed,
}

#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub request_id: String,
    pub stage: Stage,

    pub outcome: Option<String>,
    pub detail: Option<String>,
    pub elapsed_ms: Option<u128>,
    pub document_fingerprint: Option<String>,
}

impl TraceEvent {
    pub fn now(request_id: &str, stage: Stage) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            request_id: request_id.to_string(),
            stage,
            outcome: None,
            detail: None,
            elapsed_ms: None,
            document_fingerprint: None,
        }
    }

    pub fn with_outcome(mut self, outcome: impl ToString) -> Self {
        self.outcome = Some(outcome.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(elapsed.as_millis());
        self
    }

    pub fn with_fingerprint(mut self, document: &str) -> Self {
        self.document_fingerprint = Some(document_fingerprint(document));
        self
    }
}

/// SHA-1 of the document, for correlating repeated screens across requests.
pub fn document_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
