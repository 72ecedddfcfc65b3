//! Weld Connect Core Library
//!
//! This crate provides the core functionality for weld-connect, a terminal
//! client that walks a user through setting up an ELT sync with the Weld
//! Connect API: connect a source, create a sync, pick streams, start it and
//! watch it run.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let client = ApiClient::from_config(&config)?;
//!
//! let mut wizard = Wizard::new(WizardState::seeded(config.connection_id.clone()));
//! let sync = client.create_elt_sync(&request).await?;
//! wizard.complete(StatePatch::elt_sync(sync));
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP client, resource calls and wire models
//! - `wizard`: Step list, shared state and sequencing
//! - `poller`: Bounded sync status polling
//! - `auth`: Loopback listener for authorization callbacks
//! - `stream_config`: Stream selection and raw config editing
//! - `sync_form`: Create ELT Sync form validation
//! - `naming`: Destination schema name normalization
//! - `config`: Application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod naming;
pub mod poller;
pub mod stream_config;
pub mod sync_form;
pub mod wizard;

pub use api::{ApiClient, ApiError, ApiResult};
pub use auth::{AuthCallbackServer, AuthError};
pub use config::Config;
pub use naming::destination_schema_name;
pub use poller::{PollerCommand, PollerConfig, PollerEvent, PollerHandle};
pub use stream_config::{StreamConfigEditor, StreamConfigError};
pub use sync_form::{SettingsSummary, SyncForm, SyncFormError};
pub use wizard::{ActiveStep, StatePatch, StepId, Wizard, WizardState};
