use thiserror::Error;

use crate::tree::tree_model::NodeId;

/// Errors surfaced to the caller of a guidance request.
#[derive(Debug, Error)]
pub enum GuidanceError {
    /// The UI hierarchy document is not well-formed markup
    #[error("Malformed UI hierarchy document: {0}")]
    Parse(#[from] roxmltree::Error),

    /// Neither an inline document nor a document location was given
    #[error("At least a document or a document path/url must be provided")]
    MissingDocument,

    /// Inline image is not valid base64
    #[error("Invalid base64 image data")]
    InvalidImage,

    /// Document could not be fetched or read
    #[error("Failed to load {location}: {reason}")]
    Input { location: String, reason: String },

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A popup detector, ranking oracle or data generator call that did not
/// produce a usable answer. Always recovered into a fallback.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{collaborator} is not configured")]
    NotConfigured { collaborator: &'static str },

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Unusable payload: {0}")]
    Payload(String),
}

/// Internal to the result merger; the merger recovers from it.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("generated field #{index} is not a JSON object")]
    FieldNotObject { index: usize },

    #[error("generated field #{index} has no metadata object")]
    MissingMetadata { index: usize },
}

/// Internal to the candidate filter; triggers the relaxed selection.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("node {0} is not part of the tree")]
    UnknownNode(NodeId),
}
