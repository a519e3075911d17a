use serde::Serialize;
use serde_json::{Map, Value};

use crate::guidance::error::CollaboratorError;
use crate::guidance::guidance_model::RankedAction;
use crate::score::heuristic::heuristic_score;
use crate::tree::bounds::Bounds;
use crate::tree::builder::{INHERITED_BOOLEAN_FIELDS, normalize_key};
use crate::tree::tree_model::Attributes;

pub const DEFAULT_POPUP_TEST_CASE: &str = "Close the pop up";

/// Payload sent to the popup handler agent.
#[derive(Debug, Clone, Serialize)]
pub struct PopupRequest<'a> {
    #[serde(rename = "xml")]
    pub document: &'a str,
    #[serde(rename = "xml_url")]
    pub document_url: Option<&'a str>,
    pub image: Option<&'a str>,
    pub image_url: Option<&'a str>,
    #[serde(rename = "testcase_dec")]
    pub test_case_description: &'a str,
}

pub trait PopupDetector: Send + Sync {
    /// Raw response body of the detector.
    fn detect(&self, request: &PopupRequest<'_>) -> Result<Value, CollaboratorError>;
}

/// Read a popup handler response.
///
/// `Ok(Some(metadata))` when a popup was detected together with the element
/// to close it, `Ok(None)` when the screen is clear, `Err` when the answer
/// cannot be trusted.
pub fn interpret_popup_response(
    response: &Value,
) -> Result<Option<Map<String, Value>>, CollaboratorError> {
    let status = response.get("status").and_then(Value::as_str).unwrap_or("");
    if !status.eq_ignore_ascii_case("success") {
        return Err(CollaboratorError::Payload(format!(
            "popup detection status '{}'",
            status
        )));
    }

    let agent_response = response.get("agent_response").unwrap_or(&Value::Null);
    let detected = match agent_response.get("popup_detection") {
        Some(Value::Bool(b)) => *b,
        other => {
            return Err(CollaboratorError::Payload(format!(
                "popup_detection is not a boolean: {:?}",
                other
            )));
        }
    };

    if !detected {
        return Ok(None);
    }

    agent_response
        .get("element_metadata")
        .or_else(|| agent_response.pointer("/primary_method/element_metadata"))
        .and_then(Value::as_object)
        .cloned()
        .map(Some)
        .ok_or_else(|| {
            CollaboratorError::Payload("popup detected without element metadata".to_string())
        })
}

/// Turn the popup element into the single action to perform: close it.
pub fn popup_to_ranked_action(metadata: &Map<String, Value>) -> RankedAction {
    let text_of = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| metadata.get(*k).and_then(Value::as_str))
            .unwrap_or("")
            .to_string()
    };

    let bounds = Bounds::parse_or_default(&text_of(&["bounds"]));
    let text = text_of(&["text"]);
    let content_desc = text_of(&["content_desc", "content-desc"]);
    let description = format!("{} {}", text, content_desc).trim().to_string();

    let mut attributes = Attributes::new();
    for (key, value) in metadata {
        if let Value::String(s) = value {
            attributes.insert(normalize_key(key), s.clone());
        }
    }
    for field in INHERITED_BOOLEAN_FIELDS {
        let value = metadata
            .get(field)
            .or_else(|| metadata.get(field.replace('_', "-").as_str()));
        attributes.insert(field.to_string(), coerce_bool(value).to_string());
    }
    attributes.insert("bounds".to_string(), bounds.to_string());

    let heuristic_score = heuristic_score(&description, &attributes);

    RankedAction {
        node_id: None,
        rank: 1,
        description,
        heuristic_score,
        bounds,
        attributes,
        generated_data: None,
    }
}

/// Case-insensitive `"true"`, or a JSON boolean. Anything else is false.
fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
