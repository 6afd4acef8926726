//! Domain models for the crop yield prediction client

mod prediction;
mod result;
mod user;

pub use prediction::*;
pub use result::*;
pub use user::*;
