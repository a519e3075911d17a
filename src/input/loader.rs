use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::guidance::error::GuidanceError;

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Raw bytes from an `http(s)://` URL or a local path.
pub fn fetch_bytes(location: &str) -> Result<Vec<u8>, GuidanceError> {
    let input_error = |reason: String| GuidanceError::Input {
        location: location.to_string(),
        reason,
    };

    if is_remote(location) {
        debug!(location, "fetching remote input");
        let response = reqwest::blocking::get(location).map_err(|e| input_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(input_error(format!("status {}", status)));
        }
        let bytes = response.bytes().map_err(|e| input_error(e.to_string()))?;
        Ok(bytes.to_vec())
    } else {
        std::fs::read(location).map_err(|e| input_error(e.to_string()))
    }
}

/// UI hierarchy document from a path or URL.
pub fn load_document(location: &str) -> Result<String, GuidanceError> {
    let bytes = fetch_bytes(location)?;
    String::from_utf8(bytes).map_err(|e| GuidanceError::Input {
        location: location.to_string(),
        reason: format!("not UTF-8: {}", e),
    })
}

/// Screenshot from a path or URL, base64-encoded. The image is optional, so
/// a failure only drops it.
pub fn load_image(request_id: &str, location: &str) -> Option<String> {
    match fetch_bytes(location) {
        Ok(bytes) => Some(STANDARD.encode(bytes)),
        Err(e) => {
            warn!(request_id, error = %e, "could not load image; continuing without it");
            None
        }
    }
}

pub fn validate_base64(data: &str) -> Result<(), GuidanceError> {
    STANDARD
        .decode(data.trim())
        .map(|_| ())
        .map_err(|_| GuidanceError::InvalidImage)
}
