//! Prediction pipeline tests against an in-process mock backend
//!
//! Covers dispatch and normalization end to end:
//! - Farmer-friendly success with string yields
//! - Structured, flat and server errors
//! - Unreachable backend
//! - Stale responses from superseded requests

use std::time::Duration;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    Confidence, ErrorKind, FormInput, LegacyPredictionRequest, MemoryStorage, Session,
    SessionStore, UserProfile,
};
use tokio_test::assert_ok;

use crop_yield_client::{PredictionApiClient, PredictionPipeline, RequestPhase, Submission};

// ============================================================================
// Mock Backend
// ============================================================================

async fn farmer_friendly(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let location = body["location"].as_str().unwrap_or_default().to_string();
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();

    match location.as_str() {
        "India" => Json(json!({
            "predicted_yield": "45230.5",
            "unit": "hg/ha",
            "confidence_score": 0.85,
            "model_info": {"is_fallback": false, "model_type": "random_forest"},
            "auto_fetched_weather": ["avg_temp", "rainfall_mm"],
            "defaulted_parameters": ["soil_ph", "nitrogen"],
            "region_used": "India",
            "weather_conditions": {"temperature": 26.1, "rainfall": 1083.0}
        }))
        .into_response(),
        "Antarctica" => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "detail": {
                    "error": "Rice is not suitable for this climate",
                    "suggested_crops": ["Maize", "Barley"],
                    "climate_data": {"avg_temp": -20.0, "rainfall_mm": 200.0}
                }
            })),
        )
            .into_response(),
        "Atlantis" => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Location not found"})),
        )
            .into_response(),
        "Crash" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Model failed to load"})),
        )
            .into_response(),
        "Garbage" => (StatusCode::OK, "<html>oops</html>").into_response(),
        "Slow" => {
            tokio::time::sleep(Duration::from_millis(400)).await;
            Json(json!({"predicted_yield": 1000.0, "region_used": "Slow"})).into_response()
        }
        "Echo" => Json(json!({"predicted_yield": 2500, "region_used": auth})).into_response(),
        other => Json(json!({"predicted_yield": 1500.0, "region_used": other})).into_response(),
    }
}

async fn legacy(Json(body): Json<Value>) -> Response {
    // The legacy endpoint requires every climate input.
    if body.get("avg_temp").is_none() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{
                "loc": ["body", "avg_temp"],
                "msg": "field required",
                "type": "value_error.missing"
            }]})),
        )
            .into_response();
    }
    Json(json!({"predicted_yield": 3976.1, "confidence": "high", "unit": "hg/ha"})).into_response()
}

async fn batch(Json(body): Json<Vec<Value>>) -> Response {
    let entries: Vec<Value> = body
        .iter()
        .map(|entry| {
            if entry["crop_name"] == "Unknown" {
                json!({"predicted_yield": 0, "unit": "error", "confidence": "low"})
            } else {
                json!({"predicted_yield": 3000.0, "unit": "hg/ha", "confidence": "medium"})
            }
        })
        .collect();
    Json(entries).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "ml_model_loaded": true, "timestamp": "2024-01-01T00:00:00"}))
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/predict/farmer-friendly", post(farmer_friendly))
        .route("/predict/", post(legacy))
        .route("/predict/batch", post(batch))
        .route("/predict/health", get(health));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn input(value: Value) -> FormInput {
    value.as_object().cloned().unwrap()
}

async fn pipeline() -> PredictionPipeline {
    let base_url = spawn_backend().await;
    PredictionPipeline::new(assert_ok!(PredictionApiClient::with_base_url(base_url)))
}

// ============================================================================
// Success Path
// ============================================================================

#[tokio::test]
async fn test_string_yield_is_normalized() {
    let pipeline = pipeline().await;
    let submission = pipeline
        .submit_with_token(&input(json!({"location": "India", "crop": "Rice"})), None)
        .await;

    let result = submission.result().unwrap();
    let success = result.success().unwrap();
    assert_eq!(success.predicted_yield, 45230.5);
    assert_eq!(success.unit, "hg/ha");
    assert_eq!(success.confidence, Confidence::High);
    assert_eq!(success.model_fallback, Some(false));
    assert_eq!(success.region_used.as_deref(), Some("India"));
    assert!(success.factors.iter().any(|f| f.contains("auto-fetched")));
    assert!(success.recommendations.iter().any(|r| r.contains("soil test")));

    let state = pipeline.state();
    assert_eq!(state.phase, RequestPhase::Succeeded);
    assert_eq!(state.result.as_ref(), Some(result));
}

#[tokio::test]
async fn test_legacy_field_names_are_accepted() {
    let pipeline = pipeline().await;
    let submission = pipeline
        .submit_with_token(
            &input(json!({
                "area_name": "Kenya",
                "crop_name": "Maize",
                "year": "2024",
                "avg_temp": "22.5"
            })),
            None,
        )
        .await;

    let success = submission.result().and_then(|r| r.success()).unwrap().clone();
    assert_eq!(success.region_used.as_deref(), Some("Kenya"));
    assert_eq!(success.predicted_yield, 1500.0);
}

#[tokio::test]
async fn test_bearer_token_from_session_is_attached() {
    let pipeline = pipeline().await;
    let store = SessionStore::new(MemoryStorage::new());
    assert_ok!(store.login(Session::new("abc123", UserProfile::from_email("farmer@example.com"))));

    let submission = pipeline
        .submit(&input(json!({"location": "Echo", "crop": "Wheat"})), &store)
        .await;
    let success = submission.result().and_then(|r| r.success()).unwrap().clone();
    assert_eq!(success.region_used.as_deref(), Some("Bearer abc123"));

    assert_ok!(store.logout());
    let submission = pipeline
        .submit(&input(json!({"location": "Echo", "crop": "Wheat"})), &store)
        .await;
    let success = submission.result().and_then(|r| r.success()).unwrap().clone();
    assert_eq!(success.region_used.as_deref(), Some("anonymous"));
}

// ============================================================================
// Failure Paths
// ============================================================================

#[tokio::test]
async fn test_structured_rejection_surfaces_suggestions_in_order() {
    let pipeline = pipeline().await;
    let submission = pipeline
        .submit_with_token(&input(json!({"location": "Antarctica", "crop": "Rice"})), None)
        .await;

    let failure = submission.result().and_then(|r| r.failure()).unwrap().clone();
    assert_eq!(failure.kind, ErrorKind::HttpStructured);
    assert_eq!(failure.http_status, Some(400));
    assert_eq!(failure.message, "Rice is not suitable for this climate");
    assert_eq!(
        failure.suggested_crops,
        Some(vec!["Maize".to_string(), "Barley".to_string()])
    );
    let climate = failure.climate.unwrap();
    assert_eq!(climate.temperature, Some(-20.0));
    assert_eq!(climate.rainfall, Some(200.0));
    assert_eq!(pipeline.state().phase, RequestPhase::Failed);
}

#[tokio::test]
async fn test_flat_and_server_errors() {
    let pipeline = pipeline().await;

    let submission = pipeline
        .submit_with_token(&input(json!({"location": "Atlantis", "crop": "Rice"})), None)
        .await;
    let failure = submission.result().and_then(|r| r.failure()).unwrap().clone();
    assert_eq!(failure.kind, ErrorKind::HttpFlat);
    assert_eq!(failure.message, "Location not found");
    assert_eq!(failure.suggested_crops, None);

    let submission = pipeline
        .submit_with_token(&input(json!({"location": "Crash", "crop": "Rice"})), None)
        .await;
    let failure = submission.result().and_then(|r| r.failure()).unwrap().clone();
    assert_eq!(failure.kind, ErrorKind::HttpServer);
    assert_eq!(failure.http_status, Some(500));
    assert_eq!(failure.message, "Model failed to load");
}

#[tokio::test]
async fn test_malformed_success_body_is_invalid_response() {
    let pipeline = pipeline().await;
    let submission = pipeline
        .submit_with_token(&input(json!({"location": "Garbage", "crop": "Rice"})), None)
        .await;
    let failure = submission.result().and_then(|r| r.failure()).unwrap().clone();
    assert_eq!(failure.kind, ErrorKind::InvalidResponse);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_failure() {
    let client = assert_ok!(PredictionApiClient::with_base_url("http://127.0.0.1:1"));
    let pipeline = PredictionPipeline::new(client);

    let submission = pipeline
        .submit_with_token(&input(json!({"location": "India", "crop": "Rice"})), None)
        .await;
    let failure = submission.result().and_then(|r| r.failure()).unwrap().clone();
    assert_eq!(failure.kind, ErrorKind::Network);
    assert_eq!(failure.http_status, None);
    assert_eq!(pipeline.state().phase, RequestPhase::Failed);
}

#[tokio::test]
async fn test_missing_fields_never_reach_the_backend() {
    // Port 1 refuses connections; a dispatched request would fail with a
    // network error instead of a validation error.
    let client = assert_ok!(PredictionApiClient::with_base_url("http://127.0.0.1:1"));
    let pipeline = PredictionPipeline::new(client);

    let submission = pipeline
        .submit_with_token(&input(json!({"location": "", "year": 2024})), None)
        .await;
    let failure = submission.result().and_then(|r| r.failure()).unwrap().clone();
    assert_eq!(failure.kind, ErrorKind::Validation);
    let fields: Vec<_> = failure.field_errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, vec![shared::Field::Location, shared::Field::CropName]);
    assert_eq!(pipeline.state().phase, RequestPhase::Invalid);
}

// ============================================================================
// Request Sequencing
// ============================================================================

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let pipeline = pipeline().await;
    let slow = input(json!({"location": "Slow", "crop": "Rice"}));
    let fast = input(json!({"location": "Kenya", "crop": "Maize"}));

    let (first, second) = tokio::join!(pipeline.submit_with_token(&slow, None), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        pipeline.submit_with_token(&fast, None).await
    });

    assert_eq!(
        first,
        Submission::Superseded {
            request_id: 1,
            latest: 2
        }
    );
    let delivered = second.result().and_then(|r| r.success()).unwrap().clone();
    assert_eq!(delivered.region_used.as_deref(), Some("Kenya"));

    let state = pipeline.state();
    assert_eq!(state.request_id, 2);
    assert_eq!(state.phase, RequestPhase::Succeeded);
    assert_eq!(
        state.result.and_then(|r| r.success().cloned()).and_then(|s| s.region_used),
        Some("Kenya".to_string())
    );
}

#[tokio::test]
async fn test_subscribers_see_final_state() {
    let pipeline = pipeline().await;
    let mut rx = pipeline.subscribe();

    pipeline
        .submit_with_token(&input(json!({"location": "India", "crop": "Rice"})), None)
        .await;

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.phase, RequestPhase::Succeeded);

    pipeline.reset();
    assert_eq!(rx.borrow_and_update().phase, RequestPhase::Idle);
}

// ============================================================================
// Other Endpoints
// ============================================================================

#[tokio::test]
async fn test_legacy_batch_and_health() {
    let base_url = spawn_backend().await;
    let client = assert_ok!(PredictionApiClient::with_base_url(base_url));

    let request = LegacyPredictionRequest {
        area_name: "India".to_string(),
        crop_name: "Wheat".to_string(),
        year: 2024,
        avg_temp: 25.5,
        rainfall_mm: 1200.0,
        pesticide_tonnes: 150.0,
    };
    let result = client.predict_legacy(&request, None).await;
    assert_eq!(result.success().unwrap().predicted_yield, 3976.1);

    let unknown = LegacyPredictionRequest {
        crop_name: "Unknown".to_string(),
        ..request.clone()
    };
    let results = assert_ok!(client.predict_batch(&[request, unknown], None).await);
    assert_eq!(results.len(), 2);
    assert!(results[0].is_success());
    assert_eq!(results[1].failure().unwrap().kind, ErrorKind::HttpServer);

    let health = assert_ok!(client.health().await);
    assert!(health.is_healthy());
}
