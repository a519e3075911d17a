use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::collab::datagen::{DataGenerationRequest, DataGenerator};
use crate::collab::popup::{PopupDetector, PopupRequest};
use crate::guidance::error::CollaboratorError;

/// JSON-over-HTTP client for an agent service (popup handler, test data
/// generator). One blocking POST per call, no retries.
pub struct HttpAgentClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpAgentClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| CollaboratorError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn post_json<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Value, CollaboratorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .map_err(|source| CollaboratorError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .map_err(|e| CollaboratorError::Payload(format!("{}: {}", self.endpoint, e)))
    }
}

impl PopupDetector for HttpAgentClient {
    fn detect(&self, request: &PopupRequest<'_>) -> Result<Value, CollaboratorError> {
        self.post_json(request)
    }
}

impl DataGenerator for HttpAgentClient {
    fn generate(&self, request: &DataGenerationRequest<'_>) -> Result<Value, CollaboratorError> {
        self.post_json(request)
    }
}
