use crate::tree::tree_model::Attributes;

// ============================================================================
// Heuristic desirability score
// ============================================================================

/// Keywords of actions that usually advance a journey (login, submit, ...).
pub const HIGH_PRIORITY_KEYWORDS: [&str; 7] =
    ["login", "signup", "sign up", "sign-up", "submit", "btn", "register"];

/// Keywords of credential and data-entry fields.
pub const INPUT_FIELD_KEYWORDS: [&str; 8] = [
    "input", "email", "password", "otp", "pass", "phone", "mobile", "name",
];

pub const EXTERNAL_PENALTY: i32 = -10;
pub const AD_PENALTY: i32 = -15;
pub const HIGH_PRIORITY_BONUS: i32 = 20;
pub const INPUT_FIELD_BONUS: i32 = 30;
pub const BUTTON_BONUS: i32 = 10;
pub const EDIT_TEXT_BONUS: i32 = 15;
pub const CHECKBOX_BONUS: i32 = 30;

/// Score an element from its description and attributes.
///
/// Penalties for external and ad elements, one keyword category, and one tag
/// category are summed. Reads `tag`, `resource_id`, `is_external` and `is_ad`
/// from `attributes`.
pub fn heuristic_score(description: &str, attributes: &Attributes) -> i32 {
    let mut score = 0;

    if flag(attributes, "is_external") {
        score += EXTERNAL_PENALTY;
    }
    if flag(attributes, "is_ad") {
        score += AD_PENALTY;
    }

    score += keyword_bonus(description, attr(attributes, "resource_id"));
    score += tag_bonus(attr(attributes, "tag"));

    score
}

/// First matching keyword category wins.
pub fn keyword_bonus(description: &str, resource_id: &str) -> i32 {
    if matches_any(description, resource_id, &HIGH_PRIORITY_KEYWORDS) {
        HIGH_PRIORITY_BONUS
    } else if matches_any(description, resource_id, &INPUT_FIELD_KEYWORDS) {
        INPUT_FIELD_BONUS
    } else {
        0
    }
}

pub fn tag_bonus(tag: &str) -> i32 {
    let tag = tag.to_lowercase();
    if tag.contains("button") {
        BUTTON_BONUS
    } else if tag.contains("edittext") {
        EDIT_TEXT_BONUS
    } else if tag.contains("checkbox") {
        CHECKBOX_BONUS
    } else {
        0
    }
}

fn matches_any(description: &str, resource_id: &str, patterns: &[&str]) -> bool {
    let description = description.trim().to_lowercase();
    let resource_id = resource_id.to_lowercase();
    if description.is_empty() && resource_id.is_empty() {
        return false;
    }

    patterns
        .iter()
        .any(|p| description.contains(p) || resource_id.contains(p))
}

fn attr<'a>(attributes: &'a Attributes, key: &str) -> &'a str {
    attributes.get(key).map(String::as_str).unwrap_or("")
}

fn flag(attributes: &Attributes, key: &str) -> bool {
    attributes.get(key).is_some_and(|v| v == "true")
}
