//! Response normalization
//!
//! The prediction backend answers in several shapes: snake_case success
//! payloads with yields as numbers or strings, `detail` errors that are
//! either plain strings, nested objects with crop suggestions, or FastAPI
//! issue lists, and plain `{error}` bodies from the older deployment API.
//! Everything is folded into one [`PredictionResult`] here so callers never
//! branch on response shape again.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{
    ClimateSnapshot, Field, FieldError, PredictionFailure, PredictionResult, PredictionSuccess,
};
use crate::types::{Confidence, ErrorKind};

/// Unit reported when the backend omits one
pub const DEFAULT_UNIT: &str = "hg/ha";

/// Longest raw body echoed into a failure message
const MAX_ECHOED_BODY: usize = 300;

/// Parameters covered by a soil test
const SOIL_PARAMETERS: &[&str] = &[
    "soil_ph",
    "nitrogen",
    "phosphorus",
    "potassium",
    "organic_matter",
];

/// A number the backend may send as JSON number or numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// `model_info` block of a prediction payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub is_fallback: Option<bool>,
    #[serde(default)]
    pub model_type: Option<String>,
}

/// Raw prediction payload as sent by the backend
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendPrediction {
    #[serde(default)]
    pub predicted_yield: Option<NumberOrText>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub confidence: Option<NumberOrText>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
    #[serde(default)]
    pub defaulted_parameters: Vec<String>,
    #[serde(default)]
    pub auto_fetched_weather: Vec<String>,
    #[serde(default)]
    pub region_used: Option<String>,
    #[serde(default, alias = "climate_data")]
    pub weather_conditions: Option<ClimateSnapshot>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub suggested_crops: Option<Vec<String>>,
}

impl BackendPrediction {
    fn is_fallback(&self) -> Option<bool> {
        self.model_info.as_ref().and_then(|m| m.is_fallback)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Flat(String),
    Structured(StructuredDetail),
    Issues(Vec<ValidationIssue>),
}

#[derive(Debug, Deserialize)]
struct StructuredDetail {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    suggested_crops: Option<Vec<String>>,
    #[serde(default)]
    climate_data: Option<ClimateSnapshot>,
}

/// One entry of a FastAPI 422 `detail` list
#[derive(Debug, Deserialize)]
struct ValidationIssue {
    #[serde(default)]
    loc: Vec<Value>,
    msg: String,
}

/// `{error, suggested_crops?}` bodies from the older deployment API
#[derive(Debug, Deserialize)]
struct PlainErrorBody {
    error: String,
    #[serde(default)]
    suggested_crops: Option<Vec<String>>,
    #[serde(default)]
    climate_data: Option<ClimateSnapshot>,
}

// ============================================================================
// Success Normalization
// ============================================================================

/// Pick the confidence category for a payload.
///
/// An explicit label wins, then a numeric confidence, then `confidence_score`.
/// Without any of them the fallback model reports medium, the trained model high.
pub fn derive_confidence(body: &BackendPrediction) -> Confidence {
    let explicit = body.confidence.as_ref().and_then(|c| match c {
        NumberOrText::Text(label) => Confidence::from_label(label)
            .or_else(|| label.trim().parse::<f64>().ok().map(Confidence::from_score)),
        NumberOrText::Number(score) => Some(Confidence::from_score(*score)),
    });

    explicit
        .or_else(|| body.confidence_score.map(Confidence::from_fraction))
        .unwrap_or(if body.is_fallback() == Some(true) {
            Confidence::Medium
        } else {
            Confidence::High
        })
}

/// Map a 2xx payload into the canonical success shape
pub fn normalize_success(body: BackendPrediction) -> Result<PredictionSuccess, PredictionFailure> {
    let raw = body
        .predicted_yield
        .as_ref()
        .ok_or_else(|| PredictionFailure::invalid_response("Response has no predicted_yield"))?;

    let predicted_yield = raw
        .to_f64()
        .filter(|y| y.is_finite())
        .ok_or_else(|| {
            PredictionFailure::invalid_response(format!(
                "predicted_yield is not a number: {:?}",
                raw
            ))
        })?
        .max(0.0);

    let confidence = derive_confidence(&body);
    let model_fallback = body.is_fallback();
    let factors = synthesize_factors(&body);
    let recommendations = synthesize_recommendations(&body, confidence);

    Ok(PredictionSuccess {
        predicted_yield,
        unit: body
            .unit
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
        confidence,
        factors,
        recommendations,
        model_fallback,
        region_used: body.region_used,
        climate: body.weather_conditions.filter(|c| !c.is_empty()),
    })
}

fn describe_climate(climate: &ClimateSnapshot) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(t) = climate.temperature {
        parts.push(format!("{:.1}°C average temperature", t));
    }
    if let Some(r) = climate.rainfall {
        parts.push(format!("{:.0} mm annual rainfall", r));
    }
    if let Some(h) = climate.humidity {
        parts.push(format!("{:.0}% humidity", h));
    }
    if let Some(s) = climate.sunshine_hours {
        parts.push(format!("{:.1} h daily sunshine", s));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("Climate: {}", parts.join(", ")))
    }
}

/// Contributing factors shown under the predicted yield
pub fn synthesize_factors(body: &BackendPrediction) -> Vec<String> {
    let mut factors = Vec::new();

    if !body.auto_fetched_weather.is_empty() {
        let region = body.region_used.as_deref().unwrap_or("your location");
        factors.push(format!(
            "Weather data auto-fetched for {} ({} parameters)",
            region,
            body.auto_fetched_weather.len()
        ));
    }
    if let Some(line) = body.weather_conditions.as_ref().and_then(describe_climate) {
        factors.push(line);
    }
    if !body.defaulted_parameters.is_empty() {
        factors.push(format!(
            "{} parameters filled with regional defaults: {}",
            body.defaulted_parameters.len(),
            body.defaulted_parameters.join(", ")
        ));
    }
    if body.is_fallback() == Some(true) {
        factors.push("Prediction made with the fallback model".to_string());
    }
    if factors.is_empty() {
        factors.push("Prediction based on the values you provided".to_string());
    }
    factors
}

/// Follow-up advice derived from the same metadata flags
pub fn synthesize_recommendations(body: &BackendPrediction, confidence: Confidence) -> Vec<String> {
    let mut recommendations = Vec::new();

    let soil: Vec<&str> = body
        .defaulted_parameters
        .iter()
        .map(String::as_str)
        .filter(|p| SOIL_PARAMETERS.contains(p))
        .collect();
    if !soil.is_empty() {
        recommendations.push(format!(
            "Add soil test results ({}) to replace regional soil defaults",
            soil.join(", ")
        ));
    }
    if !body.auto_fetched_weather.is_empty() {
        recommendations.push(
            "Enter local temperature and rainfall readings if they differ from regional weather data"
                .to_string(),
        );
    }
    if body.is_fallback() == Some(true) {
        recommendations.push(
            "Treat this figure as an estimate: the primary model was unavailable".to_string(),
        );
    }
    if confidence == Confidence::Low {
        recommendations.push(
            "Confidence is low; compare against historical yields before planning".to_string(),
        );
    }
    if recommendations.is_empty() {
        recommendations.push(
            "All key inputs were supplied; keep recording field measurements each season"
                .to_string(),
        );
    }
    recommendations
}

// ============================================================================
// Error Normalization
// ============================================================================

fn echo_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() > MAX_ECHOED_BODY {
        let cut: String = trimmed.chars().take(MAX_ECHOED_BODY).collect();
        Some(format!("{}…", cut))
    } else {
        Some(trimmed.to_string())
    }
}

fn issue_field(issue: &ValidationIssue) -> Option<Field> {
    issue
        .loc
        .iter()
        .rev()
        .filter_map(Value::as_str)
        .find_map(Field::from_name)
}

fn issue_label(issue: &ValidationIssue) -> String {
    let path: Vec<String> = issue
        .loc
        .iter()
        .filter(|v| v.as_str() != Some("body"))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    if path.is_empty() {
        issue.msg.clone()
    } else {
        format!("{}: {}", path.join("."), issue.msg)
    }
}

/// Fold a non-2xx response into a failure
pub fn normalize_error(status: u16, body: &str) -> PredictionFailure {
    let flat_kind = if status >= 500 {
        ErrorKind::HttpServer
    } else {
        ErrorKind::HttpFlat
    };
    let structured_kind = if status >= 500 {
        ErrorKind::HttpServer
    } else {
        ErrorKind::HttpStructured
    };

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return match parsed.detail {
            ErrorDetail::Flat(message) => PredictionFailure::new(flat_kind, message),
            ErrorDetail::Structured(detail) => {
                let message = detail
                    .error
                    .or(detail.message)
                    .unwrap_or_else(|| "The prediction request was rejected".to_string());
                let mut failure = PredictionFailure::new(structured_kind, message);
                failure.suggested_crops = detail.suggested_crops;
                failure.climate = detail.climate_data.filter(|c| !c.is_empty());
                failure
            }
            ErrorDetail::Issues(issues) => {
                let message = issues
                    .iter()
                    .map(issue_label)
                    .collect::<Vec<_>>()
                    .join("; ");
                let mut failure = PredictionFailure::new(flat_kind, message);
                failure.field_errors = issues
                    .iter()
                    .filter_map(|issue| {
                        issue_field(issue).map(|field| FieldError {
                            field,
                            message: issue.msg.clone(),
                        })
                    })
                    .collect();
                failure
            }
        }
        .with_status(status);
    }

    if let Ok(plain) = serde_json::from_str::<PlainErrorBody>(body) {
        let kind = if plain.suggested_crops.is_some() || plain.climate_data.is_some() {
            structured_kind
        } else {
            flat_kind
        };
        let mut failure = PredictionFailure::new(kind, plain.error);
        failure.suggested_crops = plain.suggested_crops;
        failure.climate = plain.climate_data.filter(|c| !c.is_empty());
        return failure.with_status(status);
    }

    let message = echo_body(body).unwrap_or_else(|| format!("Request failed with HTTP {}", status));
    PredictionFailure::new(flat_kind, message).with_status(status)
}

fn rejected_in_body(body: BackendPrediction, status: u16) -> PredictionFailure {
    let has_detail = body.suggested_crops.is_some() || body.weather_conditions.is_some();
    let kind = if has_detail {
        ErrorKind::HttpStructured
    } else {
        ErrorKind::HttpFlat
    };
    let mut failure = PredictionFailure::new(
        kind,
        body.error
            .unwrap_or_else(|| "The prediction could not be made".to_string()),
    );
    failure.suggested_crops = body.suggested_crops;
    failure.climate = body.weather_conditions.filter(|c| !c.is_empty());
    failure.with_status(status)
}

/// Single entry point: status code and raw body in, uniform result out
pub fn normalize_response(status: u16, body: &str) -> PredictionResult {
    if !(200..300).contains(&status) {
        return PredictionResult::Failure(normalize_error(status, body));
    }

    match serde_json::from_str::<BackendPrediction>(body) {
        Ok(parsed) if parsed.success == Some(false) => {
            PredictionResult::Failure(rejected_in_body(parsed, status))
        }
        Ok(parsed) => normalize_success(parsed).into(),
        Err(e) => PredictionResult::Failure(
            PredictionFailure::invalid_response(format!(
                "Could not read prediction response: {}",
                e
            ))
            .with_status(status),
        ),
    }
}

/// Normalize a `/predict/batch` response.
///
/// Entries the backend marks with unit `"error"` become per-entry failures.
pub fn normalize_batch(
    status: u16,
    body: &str,
) -> Result<Vec<PredictionResult>, PredictionFailure> {
    if !(200..300).contains(&status) {
        return Err(normalize_error(status, body));
    }

    let entries: Vec<BackendPrediction> = serde_json::from_str(body).map_err(|e| {
        PredictionFailure::invalid_response(format!("Could not read batch response: {}", e))
            .with_status(status)
    })?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            if entry.unit.as_deref() == Some("error") {
                PredictionResult::Failure(PredictionFailure::new(
                    ErrorKind::HttpServer,
                    "The backend could not predict this entry",
                ))
            } else {
                normalize_success(entry).into()
            }
        })
        .collect())
}
