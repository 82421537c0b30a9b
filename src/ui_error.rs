//! User-facing error messages

use crate::error::ClientError;

pub const NETWORK_ERROR_MESSAGE: &str = "No se pudo conectar con el backend.";

/// Pick the message to show for a set of failed calls
///
/// The first backend rejection wins, then the first network failure. Anything else is a
/// defect and yields `None` so the caller can escalate it.
pub fn resolve_ui_error_message(errors: &[&ClientError]) -> Option<String> {
    if let Some(api) = errors.iter().find_map(|e| e.as_api()) {
        return Some(api.display_message());
    }

    errors
        .iter()
        .any(|e| e.is_network())
        .then(|| NETWORK_ERROR_MESSAGE.to_string())
}
