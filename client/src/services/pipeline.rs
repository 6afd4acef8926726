//! Prediction request pipeline
//!
//! validate → resolve aliases → dispatch → normalize, with a per-request
//! sequence number so a slow, older response can never overwrite the
//! result of a newer request.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use shared::{
    build_request, Field, FormInput, PredictionFailure, PredictionResult, SessionStorage,
    SessionStore, FARMER_FRIENDLY_REQUIRED,
};
use tokio::sync::watch;

use crate::external::PredictionApiClient;

/// Where the latest request stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Idle,
    Validating,
    Invalid,
    Dispatching,
    Succeeded,
    Failed,
}

impl RequestPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestPhase::Validating | RequestPhase::Dispatching)
    }
}

/// Snapshot published to UI subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineState {
    pub phase: RequestPhase,
    pub request_id: u64,
    pub result: Option<PredictionResult>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            phase: RequestPhase::Idle,
            request_id: 0,
            result: None,
        }
    }
}

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The result belongs to the latest request and was published
    Delivered {
        request_id: u64,
        result: PredictionResult,
    },
    /// A newer request was submitted while this one was in flight; the
    /// result was discarded
    Superseded { request_id: u64, latest: u64 },
}

impl Submission {
    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            Submission::Delivered { result, .. } => Some(result),
            Submission::Superseded { .. } => None,
        }
    }
}

/// Drives prediction requests from raw form input to a published result
pub struct PredictionPipeline {
    api: PredictionApiClient,
    required: Vec<Field>,
    sequence: AtomicU64,
    state: watch::Sender<PipelineState>,
}

impl PredictionPipeline {
    /// Pipeline for the farmer-friendly endpoint
    pub fn new(api: PredictionApiClient) -> Self {
        let (state, _) = watch::channel(PipelineState::default());
        Self {
            api,
            required: FARMER_FRIENDLY_REQUIRED.to_vec(),
            sequence: AtomicU64::new(0),
            state,
        }
    }

    /// Override the required field set (must include location and crop)
    pub fn with_required(mut self, required: &[Field]) -> Self {
        let mut fields = FARMER_FRIENDLY_REQUIRED.to_vec();
        for field in required {
            if !fields.contains(field) {
                fields.push(*field);
            }
        }
        self.required = fields;
        self
    }

    pub fn required(&self) -> &[Field] {
        &self.required
    }

    /// Watch the published state
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Id of the most recently submitted request
    pub fn latest_request_id(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Submit using the bearer token of the given session, if any
    pub async fn submit<S: SessionStorage>(
        &self,
        input: &FormInput,
        session: &SessionStore<S>,
    ) -> Submission {
        let token = session.token();
        self.submit_with_token(input, token.as_deref()).await
    }

    /// Submit with an explicit token
    pub async fn submit_with_token(&self, input: &FormInput, token: Option<&str>) -> Submission {
        let request_id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(request_id, RequestPhase::Validating, None);

        let request = match build_request(input, &self.required) {
            Ok(request) => request,
            Err(invalid) => {
                tracing::debug!(request_id, "Prediction input rejected: {}", invalid);
                let failure: PredictionFailure = invalid.into();
                return self.deliver(request_id, RequestPhase::Invalid, failure.into());
            }
        };

        self.publish(request_id, RequestPhase::Dispatching, None);
        tracing::debug!(
            request_id,
            location = %request.location,
            crop = %request.crop_name,
            "Submitting prediction"
        );

        let result = self.api.predict(&request, token).await;
        let phase = if result.is_success() {
            RequestPhase::Succeeded
        } else {
            RequestPhase::Failed
        };
        self.deliver(request_id, phase, result)
    }

    /// Return to idle, e.g. when the error panel is dismissed
    pub fn reset(&self) {
        let latest = self.latest_request_id();
        self.state.send_replace(PipelineState {
            phase: RequestPhase::Idle,
            request_id: latest,
            result: None,
        });
    }

    fn publish(
        &self,
        request_id: u64,
        phase: RequestPhase,
        result: Option<PredictionResult>,
    ) -> bool {
        let sequence = &self.sequence;
        self.state.send_if_modified(|state| {
            if sequence.load(Ordering::SeqCst) != request_id {
                return false;
            }
            *state = PipelineState {
                phase,
                request_id,
                result,
            };
            true
        })
    }

    fn deliver(
        &self,
        request_id: u64,
        phase: RequestPhase,
        result: PredictionResult,
    ) -> Submission {
        if self.publish(request_id, phase, Some(result.clone())) {
            Submission::Delivered { request_id, result }
        } else {
            let latest = self.latest_request_id();
            tracing::warn!(request_id, latest, "Discarding stale prediction response");
            Submission::Superseded { request_id, latest }
        }
    }
}
