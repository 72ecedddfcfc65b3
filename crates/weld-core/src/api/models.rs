//! Weld Connect API data model
//!
//! Request and response shapes for the endpoints used by the ELT sync wizard.
//! Server timestamps are kept as strings; they are only ever displayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// A source integration offered by Weld Connect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Integration {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub min_required_plan: Option<String>,
}

/// `GET /integrations`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrationList {
    pub data: Vec<Integration>,
    #[serde(default)]
    pub has_more: bool,
}

/// `POST /connection_bridges` request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateConnectionBridge {
    pub redirect_uri: String,
    pub label: String,
    pub integration_id: String,
}

/// A short-lived handshake resource; its `authorize_url` grants access
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionBridge {
    pub id: String,
    pub authorize_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// `POST /elt_syncs` request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateEltSync {
    pub connection_id: String,
    pub destination_schema_name: String,
    pub elt_settings: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Cron expression
    pub sync_interval: String,
}

/// Execution state shared by syncs and stream jobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    NotStarted,
    Running,
    Completed,
    Failed,
    /// A state this client does not know about yet
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Lower-case label for display
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::NotStarted => "not started",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A configured ELT sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EltSync {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RunStatus,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub destination_schema_name: String,
    #[serde(default)]
    pub sync_interval: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub source_connection_id: Option<String>,
    #[serde(default)]
    pub source_integration_id: Option<String>,
    #[serde(default)]
    pub destination_connection_id: Option<String>,
    #[serde(default)]
    pub destination_integration_id: Option<String>,
    #[serde(default)]
    pub orchestration_workflow_id: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default, alias = "source_streams")]
    pub streams: Vec<SourceStream>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A stream that has been added to a sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceStream {
    pub id: String,
    #[serde(default)]
    pub elt_sync_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub incremental_primary_key_name: Vec<String>,
    #[serde(default)]
    pub incremental_pointer_id: Option<String>,
    #[serde(default)]
    pub full_sync_at_midnight: bool,
    #[serde(default)]
    pub full_sync_always: bool,
    #[serde(default)]
    pub protected_from_full_sync: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Per-stream configuration sent when adding streams
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceStreamParam {
    pub name: String,
    #[serde(default)]
    pub excluded_columns: Vec<String>,
    #[serde(default)]
    pub full_sync_always: bool,
    #[serde(default)]
    pub full_sync_at_midnight: bool,
    #[serde(default)]
    pub hashed_columns: Vec<String>,
    #[serde(default)]
    pub incremental_pointer_id: String,
    #[serde(default)]
    pub protected_from_full_sync: bool,
}

impl SourceStreamParam {
    /// Config entry with every option off
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            excluded_columns: Vec::new(),
            full_sync_always: false,
            full_sync_at_midnight: false,
            hashed_columns: Vec::new(),
            incremental_pointer_id: String::new(),
            protected_from_full_sync: false,
        }
    }
}

/// `POST /elt_syncs/{id}/source_streams` request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddSourceStreams {
    pub source_streams: Vec<SourceStreamParam>,
}

/// `POST /elt_syncs/{id}/source_streams` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddedSourceStreams {
    pub source_streams: Vec<SourceStream>,
}

/// A stream the source can offer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSourceStream {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_selectable: bool,
    #[serde(default)]
    pub preselect: bool,
    #[serde(default)]
    pub sub_streams: Option<Value>,
}

/// `GET /elt_syncs/{id}/available_source_streams`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSourceStreamList {
    pub data: Vec<AvailableSourceStream>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One execution of a stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RunStatus,
    #[serde(default)]
    pub bytes_synced: u64,
    #[serde(default)]
    pub records_synced: Option<u64>,
    #[serde(default)]
    pub estimated_total_count: Option<u64>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub full_sync_trigger: Option<String>,
    #[serde(default)]
    pub operation_mode: Option<String>,
    #[serde(default)]
    pub retry_attempt: Option<u32>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Active and latest job for one stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamStatus {
    pub name: String,
    #[serde(default)]
    pub active_sync: Option<JobStatus>,
    #[serde(default)]
    pub latest_sync: Option<JobStatus>,
}

/// `GET /elt_syncs/{id}/status` - replaced wholesale on every poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EltSyncStatus {
    pub elt_sync_id: String,
    #[serde(default)]
    pub source_streams: Vec<StreamStatus>,
}

impl EltSyncStatus {
    /// Whether any stream currently has an active job
    pub fn has_active_job(&self) -> bool {
        self.source_streams.iter().any(|s| s.active_sync.is_some())
    }
}

fn default_true() -> bool {
    true
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
