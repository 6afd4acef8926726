//! Prediction API client
//!
//! Dispatches canonical requests to the prediction backend. Every public
//! prediction method returns a normalized result instead of an error:
//! transport failures, HTTP errors and malformed bodies all end up as
//! [`PredictionResult::Failure`].

use reqwest::Client;
use serde::Serialize;
use shared::{
    normalize_batch, normalize_response, HealthStatus, LegacyPredictionRequest,
    PredictionFailure, PredictionRequest, PredictionResult,
};
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::external::{http_client, join_url, REQUEST_ID_HEADER};

pub const FARMER_FRIENDLY_PATH: &str = "/predict/farmer-friendly";
pub const LEGACY_PATH: &str = "/predict/";
pub const BATCH_PATH: &str = "/predict/batch";
pub const HEALTH_PATH: &str = "/predict/health";
pub const MODEL_INFO_PATH: &str = "/predict/model-info";

/// Client for the prediction endpoints
#[derive(Clone)]
pub struct PredictionApiClient {
    client: Client,
    base_url: String,
}

impl PredictionApiClient {
    /// Create a client from configuration
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client with custom base URL and default timeout (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::new(&ApiConfig {
            base_url: base_url.into(),
            ..ApiConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and return the raw status and body text
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        token: Option<&str>,
    ) -> ClientResult<(u16, String)> {
        let url = join_url(&self.base_url, path);
        let request_id = Uuid::new_v4();

        tracing::debug!(%request_id, %url, "Dispatching prediction request");

        let mut request = self
            .client
            .post(&url)
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        tracing::debug!(%request_id, status, "Prediction response received");
        Ok((status, text))
    }

    /// Farmer-friendly prediction: only location and crop are required
    pub async fn predict(
        &self,
        request: &PredictionRequest,
        token: Option<&str>,
    ) -> PredictionResult {
        match self.post_json(FARMER_FRIENDLY_PATH, request, token).await {
            Ok((status, body)) => normalize_response(status, &body),
            Err(e) => {
                tracing::warn!("Prediction request failed: {}", e);
                PredictionResult::Failure(e.into())
            }
        }
    }

    /// Legacy prediction with explicit climate inputs
    pub async fn predict_legacy(
        &self,
        request: &LegacyPredictionRequest,
        token: Option<&str>,
    ) -> PredictionResult {
        match self.post_json(LEGACY_PATH, request, token).await {
            Ok((status, body)) => normalize_response(status, &body),
            Err(e) => {
                tracing::warn!("Legacy prediction request failed: {}", e);
                PredictionResult::Failure(e.into())
            }
        }
    }

    /// Batch of legacy predictions, one result per entry
    pub async fn predict_batch(
        &self,
        requests: &[LegacyPredictionRequest],
        token: Option<&str>,
    ) -> Result<Vec<PredictionResult>, PredictionFailure> {
        match self.post_json(BATCH_PATH, requests, token).await {
            Ok((status, body)) => normalize_batch(status, &body),
            Err(e) => {
                tracing::warn!("Batch prediction request failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Backend health check
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        let response = self
            .client
            .get(join_url(&self.base_url, HEALTH_PATH))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| {
                ClientError::InvalidResponse(format!("Failed to parse health response: {}", e))
            })
    }

    /// Information about the model the backend has loaded
    pub async fn model_info(&self) -> ClientResult<serde_json::Value> {
        let response = self
            .client
            .get(join_url(&self.base_url, MODEL_INFO_PATH))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("Failed to parse model info: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = PredictionApiClient::with_base_url("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            join_url(client.base_url(), FARMER_FRIENDLY_PATH),
            "http://localhost:8000/predict/farmer-friendly"
        );
    }
}
