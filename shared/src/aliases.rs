//! Field alias resolution
//!
//! Historical callers send either `area`/`crop`/`temperature` style keys or
//! `location`/`crop_name`/`avg_temp` style keys. One table maps every
//! canonical field to the legacy names it accepts.

use serde_json::{Map, Value};
use validator::Validate;

use crate::models::{AgronomicOverrides, Field, FieldError, PredictionRequest};
use crate::validation::{
    default_year, parse_number, parse_text, parse_year, validate_required, InvalidInput,
};

/// Raw form record as submitted by a caller
pub type FormInput = Map<String, Value>;

/// Legacy names accepted for each canonical field, in priority order
pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Location, &["area", "area_name"]),
    (Field::CropName, &["crop", "item"]),
    (Field::AvgTemp, &["temperature"]),
    (Field::RainfallMm, &["rainfall", "average_rain_fall_mm_per_year"]),
    (Field::PesticideTonnes, &["pesticides", "pesticides_tonnes"]),
    (Field::SoilPh, &["ph"]),
    (Field::NdviAvg, &["ndvi"]),
];

/// Legacy names for a field (empty for fields without aliases)
pub fn aliases_for(field: Field) -> &'static [&'static str] {
    FIELD_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// Canonical name first, then aliases
pub fn accepted_names(field: Field) -> impl Iterator<Item = &'static str> {
    std::iter::once(field.name()).chain(aliases_for(field).iter().copied())
}

/// Absent-equivalent values: `null` and empty or whitespace-only strings
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Find the value supplied for a field under any accepted name.
///
/// The canonical name wins when both it and an alias carry a value.
pub fn resolve_field(input: &FormInput, field: Field) -> Option<&Value> {
    accepted_names(field)
        .filter_map(|name| input.get(name))
        .find(|value| !is_blank(value))
}

/// Rewrite a record to canonical names only. Unresolved fields are left out.
pub fn canonicalize(input: &FormInput) -> FormInput {
    Field::ALL
        .iter()
        .filter_map(|field| {
            resolve_field(input, *field).map(|value| (field.name().to_string(), value.clone()))
        })
        .collect()
}

/// Validate a raw record and build the canonical request
pub fn build_request(
    input: &FormInput,
    required: &[Field],
) -> Result<PredictionRequest, InvalidInput> {
    validate_required(input, required)?;

    let location = match resolve_field(input, Field::Location) {
        Some(value) => parse_text(Field::Location, value)?,
        None => String::new(),
    };
    let crop_name = match resolve_field(input, Field::CropName) {
        Some(value) => parse_text(Field::CropName, value)?,
        None => String::new(),
    };
    let year = match resolve_field(input, Field::Year) {
        Some(value) => parse_year(value)?,
        None => default_year(),
    };

    let mut overrides = AgronomicOverrides::default();
    for field in Field::OVERRIDES {
        if let Some(value) = resolve_field(input, field) {
            overrides.set(field, parse_number(field, value)?);
        }
    }

    let request = PredictionRequest {
        location,
        crop_name,
        year,
        overrides,
    };

    request.validate().map_err(|errors| {
        let mut field_errors: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(name, errs)| {
                let field = Field::from_name(name);
                errs.iter().filter_map(move |e| {
                    field.map(|field| FieldError {
                        field,
                        message: e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{} is invalid", field.label())),
                    })
                })
            })
            .collect();
        field_errors.sort_by_key(|e| e.field);
        InvalidInput::Rejected {
            errors: field_errors,
        }
    })?;

    Ok(request)
}
