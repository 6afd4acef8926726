//! Normalized prediction results consumed by the UI

use serde::{Deserialize, Serialize};

use crate::models::Field;
use crate::types::{Confidence, ErrorKind};

/// Climate values echoed back by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateSnapshot {
    #[serde(default, alias = "avg_temp", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(
        default,
        alias = "average_rain_fall_mm_per_year",
        alias = "rainfall_mm",
        skip_serializing_if = "Option::is_none"
    )]
    pub rainfall: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunshine_hours: Option<f64>,
}

impl ClimateSnapshot {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.rainfall.is_none()
            && self.humidity.is_none()
            && self.sunshine_hours.is_none()
    }
}

/// Inline message for one form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSuccess {
    pub predicted_yield: f64,
    pub unit: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub factors: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_fallback: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<ClimateSnapshot>,
}

/// Failed prediction, whatever the cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status when the backend answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_crops: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<ClimateSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

impl PredictionFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            suggested_crops: None,
            climate: None,
            field_errors: Vec::new(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

/// Outcome of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionResult {
    Success(PredictionSuccess),
    Failure(PredictionFailure),
}

impl PredictionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success(_))
    }

    pub fn success(&self) -> Option<&PredictionSuccess> {
        match self {
            PredictionResult::Success(s) => Some(s),
            PredictionResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&PredictionFailure> {
        match self {
            PredictionResult::Success(_) => None,
            PredictionResult::Failure(f) => Some(f),
        }
    }
}

impl From<PredictionSuccess> for PredictionResult {
    fn from(s: PredictionSuccess) -> Self {
        PredictionResult::Success(s)
    }
}

impl From<PredictionFailure> for PredictionResult {
    fn from(f: PredictionFailure) -> Self {
        PredictionResult::Failure(f)
    }
}

impl From<Result<PredictionSuccess, PredictionFailure>> for PredictionResult {
    fn from(r: Result<PredictionSuccess, PredictionFailure>) -> Self {
        match r {
            Ok(s) => PredictionResult::Success(s),
            Err(f) => PredictionResult::Failure(f),
        }
    }
}
