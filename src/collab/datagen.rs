use serde::Serialize;
use serde_json::{Map, Value};

use crate::guidance::error::CollaboratorError;

/// Payload sent to the test data generator agent.
#[derive(Debug, Clone, Serialize)]
pub struct DataGenerationRequest<'a> {
    #[serde(rename = "xml")]
    pub document: &'a str,
    #[serde(rename = "xml_url")]
    pub document_url: Option<&'a str>,
    pub image: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub config: &'a Map<String, Value>,
}

pub trait DataGenerator: Send + Sync {
    fn generate(&self, request: &DataGenerationRequest<'_>) -> Result<Value, CollaboratorError>;
}

/// `Ok(Some(fields))` only when generation is explicitly required.
/// A `fields` value that is not a list counts as no fields.
pub fn interpret_data_generation_response(
    response: &Value,
) -> Result<Option<Vec<Value>>, CollaboratorError> {
    let status = response.get("status").and_then(Value::as_str).unwrap_or("");
    if !status.eq_ignore_ascii_case("success") {
        return Err(CollaboratorError::Payload(format!(
            "data generation status '{}'",
            status
        )));
    }

    let agent_response = response.get("agent_response").unwrap_or(&Value::Null);
    let required = agent_response
        .get("data_generation_required")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !required {
        return Ok(None);
    }

    let fields = agent_response
        .get("fields")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(Some(fields))
}
