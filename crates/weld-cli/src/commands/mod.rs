//! CLI command handlers

pub mod bridge;
pub mod config;
pub mod integrations;
pub mod schema;
pub mod status;
pub mod stream;
pub mod sync;
