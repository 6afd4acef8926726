//! Validation utilities for prediction and registration input
//!
//! Everything here is pure: failures block submission but never panic.

use chrono::Datelike;
use serde_json::Value;
use thiserror::Error;

use crate::aliases::{resolve_field, FormInput};
use crate::models::{Field, FieldError, PredictionFailure, RegisterInput, MAX_YEAR, MIN_YEAR};
use crate::types::ErrorKind;

/// Required fields for the farmer-friendly endpoint
pub const FARMER_FRIENDLY_REQUIRED: &[Field] = &[Field::Location, Field::CropName];

/// Required fields for the legacy `/predict/` endpoint
pub const LEGACY_REQUIRED: &[Field] = &[
    Field::Location,
    Field::CropName,
    Field::Year,
    Field::AvgTemp,
    Field::RainfallMm,
    Field::PesticideTonnes,
];

/// Required fields absent from an input record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing required fields: {}", join_names(.missing))]
pub struct MissingFields {
    pub missing: Vec<Field>,
}

/// Why an input record cannot become a request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("Missing required fields: {}", join_names(.missing))]
    MissingFields { missing: Vec<Field> },

    #[error("{} must be a number (got {value:?})", .field.label())]
    Malformed { field: Field, value: String },

    #[error("Year must be between 2020 and 2030 (got {year})")]
    YearOutOfRange { year: i64 },

    #[error("Invalid input: {}", join_messages(.errors))]
    Rejected { errors: Vec<FieldError> },
}

fn join_names(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<MissingFields> for InvalidInput {
    fn from(m: MissingFields) -> Self {
        InvalidInput::MissingFields { missing: m.missing }
    }
}

impl InvalidInput {
    /// Inline messages, one per offending field
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            InvalidInput::MissingFields { missing } => missing
                .iter()
                .map(|field| FieldError {
                    field: *field,
                    message: format!("{} is required", field.label()),
                })
                .collect(),
            InvalidInput::Malformed { field, .. } => vec![FieldError {
                field: *field,
                message: format!("{} must be a number", field.label()),
            }],
            InvalidInput::YearOutOfRange { .. } => vec![FieldError {
                field: Field::Year,
                message: format!("Year must be between {} and {}", MIN_YEAR, MAX_YEAR),
            }],
            InvalidInput::Rejected { errors } => errors.clone(),
        }
    }
}

impl From<InvalidInput> for PredictionFailure {
    fn from(err: InvalidInput) -> Self {
        let mut failure = PredictionFailure::new(ErrorKind::Validation, err.to_string());
        failure.field_errors = err.field_errors();
        failure
    }
}

// ============================================================================
// Prediction Input Validations
// ============================================================================

/// Check that every required field is present under its canonical name or an alias.
///
/// `null`, empty strings and absent keys all count as missing.
pub fn validate_required(input: &FormInput, required: &[Field]) -> Result<(), MissingFields> {
    let missing: Vec<Field> = required
        .iter()
        .copied()
        .filter(|field| resolve_field(input, *field).is_none())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingFields { missing })
    }
}

/// Parse a free-text field. Numbers are accepted and rendered as text.
pub fn parse_text(field: Field, value: &Value) -> Result<String, InvalidInput> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(InvalidInput::Malformed {
            field,
            value: other.to_string(),
        }),
    }
}

/// Parse a numeric field from a JSON number or numeric text. Must be finite.
pub fn parse_number(field: Field, value: &Value) -> Result<f64, InvalidInput> {
    let malformed = || InvalidInput::Malformed {
        field,
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };

    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(malformed)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| malformed())?,
        _ => return Err(malformed()),
    };

    if number.is_finite() {
        Ok(number)
    } else {
        Err(malformed())
    }
}

/// Parse the target year and check it is within the supported range
pub fn parse_year(value: &Value) -> Result<i32, InvalidInput> {
    let malformed = || InvalidInput::Malformed {
        field: Field::Year,
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    };

    let year: i64 = match value {
        Value::Number(n) => match n.as_i64() {
            Some(y) => y,
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.is_finite() => f as i64,
                _ => return Err(malformed()),
            },
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| malformed())?,
        _ => return Err(malformed()),
    };

    if year < MIN_YEAR as i64 || year > MAX_YEAR as i64 {
        return Err(InvalidInput::YearOutOfRange { year });
    }
    Ok(year as i32)
}

/// Year used when the caller leaves it blank
pub fn default_year() -> i32 {
    chrono::Utc::now().year().clamp(MIN_YEAR, MAX_YEAR)
}

// ============================================================================
// Registration Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

/// Validate farm size in acres
pub fn validate_farm_size(farm_size: Option<f64>) -> Result<(), &'static str> {
    match farm_size {
        Some(size) if !size.is_finite() || size < 0.0 => {
            Err("Farm size must be a non-negative number")
        }
        _ => Ok(()),
    }
}

/// Validate a registration form
pub fn validate_registration(input: &RegisterInput) -> Result<(), &'static str> {
    validate_email(&input.email)?;
    validate_password(&input.password)?;
    if input.first_name.trim().is_empty() {
        return Err("First name is required");
    }
    if input.last_name.trim().is_empty() {
        return Err("Last name is required");
    }
    validate_farm_size(input.farm_size)
}
