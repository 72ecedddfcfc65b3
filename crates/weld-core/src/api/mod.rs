//! Weld Connect API access
//!
//! - `client`: HTTP transport with API key header and error normalization
//! - `resources`: one accessor per API operation
//! - `models`: request/response types
//! - `error`: the single error type all calls fail with

mod client;
mod error;
pub mod models;
mod resources;

pub use client::{ApiClient, API_KEY_HEADER};
pub use error::{ApiError, ApiResult};
pub use models::*;
