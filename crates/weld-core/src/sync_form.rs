//! Create ELT Sync form
//!
//! Holds the user's choices for a new sync and turns them into a
//! [`CreateEltSync`] request. ELT settings are entered as a JSON object and
//! checked against the `required` list of the settings schema.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::CreateEltSync;
use crate::naming::destination_schema_name;

/// Cron expression and label for each selectable sync interval
pub const SYNC_INTERVALS: [(&str, &str); 3] = [
    ("0 0 * * *", "Every day"),
    ("0 */12 * * *", "Every 12 hours"),
    ("0 * * * *", "Every hour"),
];

/// Interval preselected on a new form
pub const DEFAULT_SYNC_INTERVAL: &str = "0 0 * * *";

/// Validation failures that block submission
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SyncFormError {
    #[error("ELT settings are not valid JSON: {0}")]
    InvalidSettings(String),

    #[error("ELT settings must be a JSON object")]
    SettingsNotObject,

    #[error("Missing required setting '{0}'")]
    MissingSetting(String),

    #[error("Invalid start date '{0}'. Use YYYY-MM-DD.")]
    InvalidStartDate(String),

    #[error("Destination schema name cannot be empty")]
    EmptySchemaName,
}

/// What the settings schema asks for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSummary {
    pub properties: Vec<String>,
    pub required: Vec<String>,
}

impl SettingsSummary {
    /// Summarize a JSON Schema object; anything else yields an empty summary
    pub fn from_schema(schema: &Value) -> Self {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            properties,
            required,
        }
    }

    /// Whether the integration needs no settings at all
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.required.is_empty()
    }
}

/// Parse hand-written settings and check required keys
pub fn parse_settings(
    raw: &str,
    summary: &SettingsSummary,
) -> Result<Map<String, Value>, SyncFormError> {
    let raw = raw.trim();
    let value: Value = if raw.is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str(raw).map_err(|e| SyncFormError::InvalidSettings(e.to_string()))?
    };

    validate_settings(value, summary)
}

/// Check an already parsed settings document against the schema summary
pub fn validate_settings(
    value: Value,
    summary: &SettingsSummary,
) -> Result<Map<String, Value>, SyncFormError> {
    let Value::Object(settings) = value else {
        return Err(SyncFormError::SettingsNotObject);
    };

    if let Some(missing) = summary
        .required
        .iter()
        .find(|key| settings.get(key.as_str()).map_or(true, Value::is_null))
    {
        return Err(SyncFormError::MissingSetting(missing.clone()));
    }

    Ok(settings)
}

/// Parse a `YYYY-MM-DD` start date to midnight UTC; blank means none
pub fn parse_start_date(input: &str) -> Result<Option<DateTime<Utc>>, SyncFormError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(timestamp.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Some(midnight.and_utc()))
        .ok_or_else(|| SyncFormError::InvalidStartDate(input.to_string()))
}

/// Form state for a new ELT sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncForm {
    pub settings_raw: String,
    pub sync_interval: usize,
    /// Start date as typed; the untouched default keeps the exact creation time
    pub start_date: String,
    pub schema_name: String,
    default_start: DateTime<Utc>,
}

impl SyncForm {
    /// Fresh form; the schema name defaults to the normalized integration id
    pub fn new(integration_id: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            settings_raw: "{}".to_string(),
            sync_interval: 0,
            start_date: now.format("%Y-%m-%d").to_string(),
            schema_name: integration_id
                .map(destination_schema_name)
                .unwrap_or_default(),
            default_start: now,
        }
    }

    pub fn interval_cron(&self) -> &'static str {
        SYNC_INTERVALS[self.sync_interval % SYNC_INTERVALS.len()].0
    }

    pub fn interval_label(&self) -> &'static str {
        SYNC_INTERVALS[self.sync_interval % SYNC_INTERVALS.len()].1
    }

    /// Cycle to the next interval option
    pub fn next_interval(&mut self) {
        self.sync_interval = (self.sync_interval + 1) % SYNC_INTERVALS.len();
    }

    /// Normalize the schema name, as when the field loses focus
    pub fn blur_schema_name(&mut self) {
        self.schema_name = destination_schema_name(&self.schema_name);
    }

    /// Whether the submit action should be enabled
    pub fn can_submit(&self, summary: &SettingsSummary) -> bool {
        !self.schema_name.is_empty() && self.validate(summary).is_ok()
    }

    /// First validation error, if any
    pub fn validate(&self, summary: &SettingsSummary) -> Result<(), SyncFormError> {
        parse_settings(&self.settings_raw, summary)?;
        self.start()?;
        if destination_schema_name(&self.schema_name).is_empty() {
            return Err(SyncFormError::EmptySchemaName);
        }
        Ok(())
    }

    fn start(&self) -> Result<Option<DateTime<Utc>>, SyncFormError> {
        if self.start_date == self.default_start.format("%Y-%m-%d").to_string() {
            return Ok(Some(self.default_start));
        }
        parse_start_date(&self.start_date)
    }

    /// Build the create request for `connection_id`
    pub fn to_request(
        &self,
        connection_id: &str,
        summary: &SettingsSummary,
    ) -> Result<CreateEltSync, SyncFormError> {
        let elt_settings = parse_settings(&self.settings_raw, summary)?;
        let start_date = self.start()?;
        let schema = destination_schema_name(&self.schema_name);
        if schema.is_empty() {
            return Err(SyncFormError::EmptySchemaName);
        }

        Ok(CreateEltSync {
            connection_id: connection_id.to_string(),
            destination_schema_name: schema,
            elt_settings,
            start_date,
            sync_interval: self.interval_cron().to_string(),
        })
    }
}
