//! WebAssembly module for the crop yield prediction client
//!
//! Exposes the shared pipeline logic to the browser UI:
//! - Input validation and alias resolution
//! - Response normalization and confidence bucketing
//! - Session state kept in `window.localStorage`
//!
//! Values cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use shared::{
    build_request, normalize_response, validate_required, Confidence, FieldError, FormInput,
    InvalidInput, PredictionFailure, SessionStorage, SessionStore, StorageError, StorageResult,
    FARMER_FRIENDLY_REQUIRED,
};

// Re-export shared types for use from Rust callers
pub use shared::models::*;
pub use shared::types::*;

fn parse_input(input_json: &str) -> Result<FormInput, String> {
    serde_json::from_str(input_json).map_err(|e| format!("Invalid input JSON: {}", e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Failed to encode JSON: {}", e))
}

fn field_errors(input_json: &str) -> Result<Vec<FieldError>, String> {
    let input = parse_input(input_json)?;
    Ok(match validate_required(&input, FARMER_FRIENDLY_REQUIRED) {
        Ok(()) => Vec::new(),
        Err(missing) => InvalidInput::from(missing).field_errors(),
    })
}

/// Canonical request JSON, or the validation failure as JSON
fn canonical_request(input_json: &str) -> Result<String, String> {
    let input = parse_input(input_json)?;
    match build_request(&input, FARMER_FRIENDLY_REQUIRED) {
        Ok(request) => to_json(&request),
        Err(invalid) => Err(to_json(&PredictionFailure::from(invalid))?),
    }
}

/// Inline field errors for a form record (`[]` when valid)
#[wasm_bindgen]
pub fn validate_prediction_input(input_json: &str) -> Result<String, JsValue> {
    field_errors(input_json)
        .and_then(|errors| to_json(&errors))
        .map_err(|e| JsValue::from_str(&e))
}

/// Resolve aliases and build the request body for `/predict/farmer-friendly`.
///
/// Rejects with a JSON `PredictionFailure` when the input is invalid.
#[wasm_bindgen]
pub fn build_prediction_request(input_json: &str) -> Result<String, JsValue> {
    canonical_request(input_json).map_err(|e| JsValue::from_str(&e))
}

/// Fold a raw backend response into a `PredictionResult` JSON object
#[wasm_bindgen]
pub fn normalize_prediction_response(status: u16, body: &str) -> String {
    let result = normalize_response(status, body);
    serde_json::to_string(&result).unwrap_or_else(|e| {
        format!(
            r#"{{"status":"failure","kind":"invalid-response","message":"{}"}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

/// Confidence category for a numeric score
#[wasm_bindgen]
pub fn confidence_category(score: f64) -> String {
    Confidence::from_score(score).to_string()
}

// ============================================================================
// Session
// ============================================================================

/// `window.localStorage` behind the session storage port.
///
/// Looked up on every call; browser handles cannot be held across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> StorageResult<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
    }
}

impl SessionStorage for LocalStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StorageError::Io(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Io(format!("{:?}", e)))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Io(format!("{:?}", e)))
    }
}

fn warn(message: &str) -> JsValue {
    let value = JsValue::from_str(message);
    web_sys::console::warn_1(&value);
    value
}

/// Store with the persisted session restored
fn session_store() -> Result<SessionStore<LocalStorage>, JsValue> {
    SessionStore::open(LocalStorage).map_err(|e| warn(&e.to_string()))
}

/// Whether a session is stored in this browser
#[wasm_bindgen]
pub fn is_authenticated() -> Result<bool, JsValue> {
    Ok(session_store()?.is_authenticated())
}

/// Bearer token of the stored session
#[wasm_bindgen]
pub fn session_token() -> Result<Option<String>, JsValue> {
    Ok(session_store()?.token())
}

/// Clear the stored session
#[wasm_bindgen]
pub fn logout() -> Result<(), JsValue> {
    SessionStore::new(LocalStorage)
        .logout()
        .map_err(|e| warn(&e.to_string()))
}
