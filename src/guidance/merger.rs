use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::guidance::error::MergeError;
use crate::guidance::guidance_model::RankedAction;
use crate::tree::bounds::Bounds;

/// A generated value for one element: the identifying `metadata` plus the
/// rest of the object, which is what gets attached to the matching action.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDataField {
    pub metadata: Map<String, Value>,
    pub payload: Map<String, Value>,
}

impl GeneratedDataField {
    pub fn from_value(index: usize, value: Value) -> Result<Self, MergeError> {
        let Value::Object(mut object) = value else {
            return Err(MergeError::FieldNotObject { index });
        };

        let metadata = match object.remove("metadata") {
            Some(Value::Object(metadata)) => metadata,
            _ => return Err(MergeError::MissingMetadata { index }),
        };

        Ok(Self {
            metadata,
            payload: object,
        })
    }

    pub fn identifier(&self) -> Option<String> {
        self.metadata
            .get("bounds")
            .and_then(Value::as_str)
            .and_then(bounds_identifier)
    }
}

/// Canonical bounds string; unparseable values compare as trimmed text.
pub fn bounds_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        Bounds::parse(trimmed)
            .map(|b| b.to_string())
            .unwrap_or_else(|| trimmed.to_string()),
    )
}

pub fn action_identifier(action: &RankedAction) -> Option<String> {
    action
        .attributes
        .get("bounds")
        .and_then(|raw| bounds_identifier(raw))
}

/// Attach generated data to ranked actions. Never fails: on an internal
/// error the input list comes back untouched.
pub fn merge_generated_data(
    request_id: &str,
    ranked_actions: Vec<RankedAction>,
    fields: Vec<Value>,
) -> Vec<RankedAction> {
    match try_merge(ranked_actions.clone(), fields) {
        Ok(merged) => merged,
        Err(e) => {
            warn!(request_id, error = %e, "merging generated data failed; returning ranked actions as-is");
            ranked_actions
        }
    }
}

/// Each field is attached at most once, to the first action with an equal
/// identifier; unmatched fields are dropped.
pub fn try_merge(
    mut ranked_actions: Vec<RankedAction>,
    fields: Vec<Value>,
) -> Result<Vec<RankedAction>, MergeError> {
    let mut pool: Vec<(Option<String>, GeneratedDataField)> = fields
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            GeneratedDataField::from_value(index, value).map(|field| (field.identifier(), field))
        })
        .collect::<Result<_, _>>()?;

    for action in ranked_actions.iter_mut() {
        let Some(identifier) = action_identifier(action) else {
            continue;
        };

        let position = pool
            .iter()
            .position(|(field_id, _)| field_id.as_deref() == Some(identifier.as_str()));

        if let Some(position) = position {
            let (_, field) = pool.remove(position);
            action.generated_data = Some(Value::Object(field.payload));
        }
    }

    if !pool.is_empty() {
        debug!(unmatched = pool.len(), "generated fields without a matching action");
    }

    Ok(ranked_actions)
}
