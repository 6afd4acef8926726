//! User, session and service status models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimal profile cached with the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_size: Option<f64>,
}

impl UserProfile {
    /// Profile known only by its login email
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            farm_size: None,
        }
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Authenticated session: bearer token plus cached profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, profile: UserProfile) -> Self {
        Self {
            token: token.into(),
            profile,
            created_at: Utc::now(),
        }
    }
}

/// Input for `/auth/register/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_size: Option<f64>,
}

impl RegisterInput {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            farm_size: self.farm_size,
        }
    }
}

/// `/predict/health` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ml_model_loaded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") && self.ml_model_loaded != Some(false)
    }
}
