//! External API integrations

use std::time::Duration;

use reqwest::Client;

use crate::error::{ClientError, ClientResult};

pub mod auth_api;
pub mod prediction_api;

pub use auth_api::AuthApiClient;
pub use prediction_api::PredictionApiClient;

/// Correlation header attached to every backend request
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Build the shared HTTP client with an explicit timeout
pub(crate) fn http_client(timeout: Duration) -> ClientResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
