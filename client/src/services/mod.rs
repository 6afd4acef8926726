//! Services for the crop yield prediction client

pub mod auth;
pub mod pipeline;

pub use auth::{token_expired, AuthService};
pub use pipeline::{PipelineState, PredictionPipeline, RequestPhase, Submission};
