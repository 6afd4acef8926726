//! Normalization and alias resolution property tests
//!
//! - Confidence bucketing is monotonic with exact 60/80 boundaries
//! - Normalized yields are always finite and non-negative
//! - Legacy names resolve to canonical fields with values preserved
//! - Missing required fields are reported exactly

use proptest::prelude::*;
use serde_json::{json, Value};
use shared::{
    build_request, canonicalize, normalize_response, validate_required, Confidence, ErrorKind,
    Field, FormInput, FARMER_FRIENDLY_REQUIRED, FIELD_ALIASES,
};

// ============================================================================
// Property Test Strategies
// ============================================================================

fn score_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        0.0f64..=100.0,
        0.0f64..=1.0,
        Just(1.0),
        Just(59.0),
        Just(60.0),
        Just(79.0),
        Just(80.0),
        Just(100.0),
    ]
}

fn location_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,8})?"
}

fn crop_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Wheat".to_string()),
        Just("Rice, paddy".to_string()),
        Just("Maize".to_string()),
        Just("Potatoes".to_string()),
        Just("Soybeans".to_string()),
    ]
}

// ============================================================================
// Confidence Bucketing
// ============================================================================

#[test]
fn test_confidence_boundaries() {
    assert_eq!(Confidence::from_score(59.0), Confidence::Low);
    assert_eq!(Confidence::from_score(60.0), Confidence::Medium);
    assert_eq!(Confidence::from_score(79.0), Confidence::Medium);
    assert_eq!(Confidence::from_score(80.0), Confidence::High);
    assert_eq!(Confidence::from_score(1.0), Confidence::Low);
}

#[test]
fn test_confidence_score_field_is_a_fraction() {
    let result = normalize_response(200, r#"{"predicted_yield":1200,"confidence_score":0.85}"#);
    assert_eq!(result.success().unwrap().confidence, Confidence::High);

    let result = normalize_response(200, r#"{"predicted_yield":1200,"confidence":0.85}"#);
    assert_eq!(result.success().unwrap().confidence, Confidence::Low);
}

// ============================================================================
// Failure Serialization
// ============================================================================

#[test]
fn test_http_failure_serializes_with_status_tag() {
    let result = normalize_response(400, r#"{"detail":"Crop 'Quinoa' is not supported"}"#);
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "failure");
    assert_eq!(value["http_status"], 400);
    assert_eq!(value["kind"], "http-4xx-flat");

    let text = serde_json::to_string(&result).unwrap();
    let back: shared::PredictionResult = serde_json::from_str(&text).unwrap();
    assert_eq!(back, result);
}

proptest! {
    #[test]
    fn prop_confidence_is_monotonic(a in score_strategy(), b in score_strategy()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Confidence::from_score(lo) <= Confidence::from_score(hi));
    }

    #[test]
    fn prop_numeric_confidence_in_body_matches_bucket(score in score_strategy()) {
        let body = json!({"predicted_yield": 1000, "confidence": score}).to_string();
        let result = normalize_response(200, &body);
        prop_assert_eq!(result.success().unwrap().confidence, Confidence::from_score(score));
    }
}

// ============================================================================
// Yield Normalization
// ============================================================================

proptest! {
    #[test]
    fn prop_numeric_yield_is_finite_and_non_negative(y in -1.0e9f64..1.0e9) {
        let body = json!({"predicted_yield": y}).to_string();
        let success = normalize_response(200, &body).success().cloned().unwrap();
        prop_assert!(success.predicted_yield.is_finite());
        prop_assert!(success.predicted_yield >= 0.0);
        if y >= 0.0 {
            prop_assert!((success.predicted_yield - y).abs() <= y.abs() * 1e-12);
        }
    }

    #[test]
    fn prop_string_yield_matches_number(y in 0.0f64..1.0e7) {
        let text = format!("{:.2}", y);
        let expected: f64 = text.parse().unwrap();
        let body = json!({"predicted_yield": text}).to_string();
        let success = normalize_response(200, &body).success().cloned().unwrap();
        prop_assert_eq!(success.predicted_yield, expected);
    }

    #[test]
    fn prop_non_numeric_yield_is_invalid_response(text in "[a-zA-Z ]{1,12}") {
        prop_assume!(text.trim().parse::<f64>().is_err());
        let body = json!({"predicted_yield": text}).to_string();
        let failure = normalize_response(200, &body).failure().cloned().unwrap();
        prop_assert_eq!(failure.kind, ErrorKind::InvalidResponse);
    }
}

#[test]
fn test_unit_defaults_when_missing() {
    let success = normalize_response(200, r#"{"predicted_yield": 10}"#)
        .success()
        .cloned()
        .unwrap();
    assert_eq!(success.unit, "hg/ha");
}

// ============================================================================
// Alias Resolution
// ============================================================================

proptest! {
    #[test]
    fn prop_legacy_names_preserve_values(
        location in location_strategy(),
        crop in crop_strategy(),
        temp in -10.0f64..45.0,
    ) {
        let mut input = FormInput::new();
        input.insert("area".to_string(), Value::String(location.clone()));
        input.insert("item".to_string(), Value::String(crop.clone()));
        input.insert("temperature".to_string(), json!(temp));

        let canonical = canonicalize(&input);
        prop_assert_eq!(canonical.get("location"), Some(&Value::String(location.clone())));
        prop_assert_eq!(canonical.get("crop_name"), Some(&Value::String(crop.clone())));
        prop_assert_eq!(canonical.get("avg_temp"), Some(&json!(temp)));

        let request = build_request(&input, FARMER_FRIENDLY_REQUIRED).unwrap();
        prop_assert_eq!(request.location, location);
        prop_assert_eq!(request.crop_name, crop);
        prop_assert_eq!(request.overrides.avg_temp, Some(temp));
    }

    #[test]
    fn prop_missing_fields_reported_exactly(
        has_location in any::<bool>(),
        has_crop in any::<bool>(),
    ) {
        let mut input = FormInput::new();
        if has_location {
            input.insert("location".to_string(), json!("India"));
        }
        if has_crop {
            input.insert("crop".to_string(), json!("Wheat"));
        }

        let mut expected = Vec::new();
        if !has_location {
            expected.push(Field::Location);
        }
        if !has_crop {
            expected.push(Field::CropName);
        }

        match validate_required(&input, FARMER_FRIENDLY_REQUIRED) {
            Ok(()) => prop_assert!(expected.is_empty()),
            Err(missing) => prop_assert_eq!(missing.missing, expected),
        }
    }
}

#[test]
fn test_every_alias_resolves_to_its_field() {
    for (field, aliases) in FIELD_ALIASES {
        for alias in *aliases {
            let mut input = FormInput::new();
            input.insert(alias.to_string(), json!("42"));
            let canonical = canonicalize(&input);
            assert_eq!(
                canonical.get(field.name()),
                Some(&json!("42")),
                "{} should resolve to {}",
                alias,
                field.name()
            );
        }
    }
}

#[test]
fn test_absent_overrides_are_not_serialized() {
    let input = json!({"location": "India", "crop": "Wheat", "year": 2024});
    let request = build_request(input.as_object().unwrap(), FARMER_FRIENDLY_REQUIRED).unwrap();
    let body = serde_json::to_value(&request).unwrap();
    assert_eq!(body, json!({"location": "India", "crop_name": "Wheat", "year": 2024}));
}
