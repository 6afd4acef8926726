//! Authentication API client
//!
//! Login is form-encoded (`username`/`password`, OAuth2 password flow).
//! Older deployments expose `/auth/login` instead of `/auth/token`.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared::{normalize_error, RegisterInput, UserProfile};

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::external::{http_client, join_url};

pub const TOKEN_PATH: &str = "/auth/token";
pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register/";
pub const ME_PATH: &str = "/auth/me";

/// Client for the authentication endpoints
#[derive(Clone)]
pub struct AuthApiClient {
    client: Client,
    base_url: String,
}

/// Token issued on login
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Pull the human-readable message out of an error body
fn error_message(status: StatusCode, body: &str) -> String {
    normalize_error(status.as_u16(), body).message
}

async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::Api { status, body }
}

impl AuthApiClient {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Exchange credentials for a bearer token
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<TokenResponse> {
        let form = [("username", email), ("password", password)];
        let paths = [TOKEN_PATH, LOGIN_PATH];

        for (i, path) in paths.iter().enumerate() {
            let response = self
                .client
                .post(join_url(&self.base_url, path))
                .form(&form)
                .send()
                .await?;

            let status = response.status();
            let is_last = i + 1 == paths.len();
            let missing = matches!(status, StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED);
            if !is_last && missing {
                tracing::debug!("{} not available ({}), trying next login endpoint", path, status);
                continue;
            }

            if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
                return Err(ClientError::InvalidCredentials);
            }

            if !status.is_success() {
                return Err(api_error(response).await);
            }

            return response
                .json()
                .await
                .map_err(|e| {
                    ClientError::InvalidResponse(format!("Failed to parse token response: {}", e))
                });
        }

        Err(ClientError::Internal("no login endpoint configured".to_string()))
    }

    /// Register a new account
    pub async fn register(&self, input: &RegisterInput) -> ClientResult<serde_json::Value> {
        let response = self
            .client
            .post(join_url(&self.base_url, REGISTER_PATH))
            .json(input)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let duplicate = status == StatusCode::CONFLICT
                || error_message(status, &body)
                    .to_lowercase()
                    .contains("already registered");
            if duplicate {
                return Err(ClientError::DuplicateEntry(input.email.clone()));
            }
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| {
                ClientError::InvalidResponse(format!(
                    "Failed to parse registration response: {}",
                    e
                ))
            })
    }

    /// Fetch the profile behind a token
    pub async fn me(&self, token: &str) -> ClientResult<UserProfile> {
        let response = self
            .client
            .get(join_url(&self.base_url, ME_PATH))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::NotAuthenticated);
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("Failed to parse profile: {}", e)))
    }
}
