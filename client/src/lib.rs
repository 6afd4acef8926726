//! Crop Yield Prediction - native client
//!
//! Request dispatch, the prediction pipeline and session handling on top of
//! the pure logic in `shared`.

pub mod config;
pub mod error;
pub mod external;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use external::{AuthApiClient, PredictionApiClient};
pub use services::{AuthService, PipelineState, PredictionPipeline, RequestPhase, Submission};
pub use storage::FileStorage;
