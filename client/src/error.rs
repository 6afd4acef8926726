//! Error handling for the crop yield prediction client
//!
//! Every dispatcher failure is eventually folded into a
//! [`PredictionFailure`] so the UI only ever sees one shape.

use shared::{ErrorKind, InvalidInput, PredictionFailure, StorageError};
use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    // Input errors
    #[error("Invalid input: {0}")]
    Validation(#[from] InvalidInput),

    #[error("Validation error: {0}")]
    ValidationError(String),

    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    // Transport errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    // Backend errors
    /// Non-success response; `body` is the raw response text
    #[error("Backend returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // Local errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Api {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(e: config::ConfigError) -> Self {
        ClientError::Configuration(e.to_string())
    }
}

impl ClientError {
    /// True when the backend could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Timeout(_))
    }
}

impl From<ClientError> for PredictionFailure {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(invalid) => invalid.into(),
            ClientError::Network(msg) => PredictionFailure::network(format!(
                "Could not reach the prediction service: {}",
                msg
            )),
            ClientError::Timeout(msg) => PredictionFailure::network(format!(
                "The prediction service did not respond in time: {}",
                msg
            )),
            ClientError::Api { status, body } => shared::normalize_error(status, &body),
            ClientError::InvalidResponse(msg) => PredictionFailure::invalid_response(msg),
            ClientError::ValidationError(msg) => PredictionFailure::new(ErrorKind::Validation, msg),
            ClientError::InvalidCredentials | ClientError::NotAuthenticated => {
                PredictionFailure::new(ErrorKind::HttpFlat, err.to_string()).with_status(401)
            }
            ClientError::DuplicateEntry(_) => {
                PredictionFailure::new(ErrorKind::HttpFlat, err.to_string()).with_status(409)
            }
            // The request never left the client.
            ClientError::Storage(_) | ClientError::Configuration(_) | ClientError::Internal(_) => {
                PredictionFailure::network(err.to_string())
            }
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Field;

    #[test]
    fn test_transport_errors_become_network_failures() {
        let failure: PredictionFailure = ClientError::Network("connection refused".into()).into();
        assert_eq!(failure.kind, ErrorKind::Network);
        assert!(failure.message.contains("connection refused"));

        let failure: PredictionFailure = ClientError::Timeout("30s".into()).into();
        assert_eq!(failure.kind, ErrorKind::Network);
    }

    #[test]
    fn test_validation_error_keeps_field_errors() {
        let failure: PredictionFailure = ClientError::Validation(InvalidInput::MissingFields {
            missing: vec![Field::CropName],
        })
        .into();
        assert_eq!(failure.kind, ErrorKind::Validation);
        assert_eq!(failure.field_errors[0].field, Field::CropName);
    }

    #[test]
    fn test_api_error_is_normalized() {
        let failure: PredictionFailure = ClientError::Api {
            status: 400,
            body: r#"{"detail":"Unknown crop"}"#.to_string(),
        }
        .into();
        assert_eq!(failure.kind, ErrorKind::HttpFlat);
        assert_eq!(failure.message, "Unknown crop");
        assert_eq!(failure.http_status, Some(400));
    }
}
