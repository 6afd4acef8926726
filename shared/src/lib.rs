//! Shared types and pure logic for the crop yield prediction client
//!
//! This crate holds everything that does not perform I/O: the request and
//! result models, field validation, alias resolution, response
//! normalization and the session store. It is used by the native client
//! and by the browser adapter (via WASM).

pub mod aliases;
pub mod models;
pub mod normalize;
pub mod session;
pub mod types;
pub mod validation;

pub use aliases::*;
pub use models::*;
pub use normalize::*;
pub use session::*;
pub use types::*;
pub use validation::*;
