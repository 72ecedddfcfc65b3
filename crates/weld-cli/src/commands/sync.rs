//! ELT sync command handlers

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use weld_core::api::SourceStreamParam;
use weld_core::poller::{spawn_sync_status_poller, PollerConfig, PollerEvent};
use weld_core::sync_form::{parse_settings, parse_start_date, validate_settings, SettingsSummary};
use weld_core::{destination_schema_name, ApiClient, StreamConfigEditor, StreamConfigError};

use crate::editor::{self, JsonShape};
use crate::output::Output;

pub struct CreateOptions {
    pub connection_id: String,
    pub schema: String,
    pub interval: String,
    pub start_date: Option<String>,
    pub settings: Option<String>,
    pub edit: bool,
}

/// Show the ELT settings schema for a connection
pub async fn settings(client: &ApiClient, connection_id: &str, output: &Output) -> Result<()> {
    let schema = client.get_elt_settings(connection_id).await?;
    output.print_settings_schema(&schema);
    Ok(())
}

/// Create an ELT sync
pub async fn create(client: &ApiClient, options: CreateOptions, output: &Output) -> Result<()> {
    let schema = client.get_elt_settings(&options.connection_id).await?;
    let summary = SettingsSummary::from_schema(&schema);

    let elt_settings = if options.edit {
        let edited = editor::edit_json(&settings_template(&summary), JsonShape::Object)?;
        validate_settings(edited.value, &summary)?
    } else {
        parse_settings(options.settings.as_deref().unwrap_or("{}"), &summary)?
    };

    let destination_schema_name = destination_schema_name(&options.schema);
    if destination_schema_name.is_empty() {
        bail!("Destination schema name cannot be empty");
    }

    let start_date = match options.start_date {
        Some(date) => parse_start_date(&date)?,
        None => Some(Utc::now()),
    };

    let request = weld_core::api::CreateEltSync {
        connection_id: options.connection_id,
        destination_schema_name,
        elt_settings,
        start_date,
        sync_interval: options.interval,
    };
    let sync = client.create_elt_sync(&request).await?;

    output.success(&format!("Created ELT sync {}", sync.id));
    output.print_sync(&sync);
    Ok(())
}

/// Show a sync
pub async fn show(client: &ApiClient, id: &str, output: &Output) -> Result<()> {
    let sync = client.get_elt_sync(id).await?;
    output.print_sync(&sync);
    Ok(())
}

/// Show per-stream status
pub async fn status(client: &ApiClient, id: &str, output: &Output) -> Result<()> {
    let (sync, status) = tokio::try_join!(client.get_elt_sync(id), client.get_elt_sync_status(id))?;
    output.print_status(&status, &sync.streams);
    Ok(())
}

pub async fn enable(client: &ApiClient, id: &str, output: &Output) -> Result<()> {
    client.enable_sync(id).await?;
    output.success("Sync enabled");
    Ok(())
}

pub async fn disable(client: &ApiClient, id: &str, output: &Output) -> Result<()> {
    client.disable_sync(id).await?;
    output.success("Sync disabled");
    Ok(())
}

pub async fn start(client: &ApiClient, id: &str, output: &Output) -> Result<()> {
    client.start_sync(id).await?;
    output.success("Sync started");
    Ok(())
}

pub async fn stop(client: &ApiClient, id: &str, output: &Output) -> Result<()> {
    client.stop_sync(id).await?;
    output.success("Sync stopped");
    Ok(())
}

/// List streams available for a sync
pub async fn streams(client: &ApiClient, id: &str, output: &Output) -> Result<()> {
    let available = client.list_available_source_streams(id).await?;
    output.print_available_streams(&available.data);
    Ok(())
}

/// Add streams by name, from raw JSON, or from $EDITOR
pub async fn add_streams(
    client: &ApiClient,
    id: &str,
    names: Vec<String>,
    config: Option<String>,
    edit: bool,
    output: &Output,
) -> Result<()> {
    let streams = if let Some(raw) = config {
        parse_stream_config(&raw)?
    } else if edit {
        let available = client.list_available_source_streams(id).await?;
        let editor_state = StreamConfigEditor::from_available(&available.data);
        let edited = editor::edit_json(editor_state.raw(), JsonShape::Array)?;
        streams_from_value(edited.value)?
    } else {
        names.into_iter().map(SourceStreamParam::empty).collect()
    };

    let added = client.add_source_streams(id, streams).await?;
    output.print_source_streams(&added.source_streams);
    Ok(())
}

/// Poll status until the window closes, printing every snapshot
pub async fn watch(client: &ApiClient, id: &str, window: Duration, output: &Output) -> Result<()> {
    let sync = client.get_elt_sync(id).await?;
    let config = PollerConfig {
        initial_window: window,
        ..PollerConfig::default()
    };
    let mut poller = spawn_sync_status_poller(client.clone(), id.to_string(), config);

    output.message(&format!(
        "Watching sync {} for {}s (Ctrl-C to stop)",
        id,
        window.as_secs()
    ));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = poller.event_rx.recv() => match event {
                Some(PollerEvent::Snapshot(status)) => {
                    output.message(&format!("── {} ──", Utc::now().format("%H:%M:%S")));
                    output.print_status(&status, &sync.streams);
                }
                Some(PollerEvent::Error(message)) => {
                    eprintln!("Status fetch failed: {}", message);
                }
                Some(PollerEvent::PollingChanged(false)) | None => break,
                Some(PollerEvent::PollingChanged(true)) => {}
            }
        }
    }

    output.message("Stopped watching.");
    Ok(())
}

fn parse_stream_config(raw: &str) -> Result<Vec<SourceStreamParam>> {
    let mut editor = StreamConfigEditor::new();
    editor.set_raw(raw);
    editor.parse().context("Invalid stream configuration")
}

fn streams_from_value(value: serde_json::Value) -> Result<Vec<SourceStreamParam>> {
    let streams: Vec<SourceStreamParam> =
        serde_json::from_value(value).context("Invalid stream configuration")?;
    if streams.is_empty() {
        return Err(StreamConfigError::Empty.into());
    }
    Ok(streams)
}

/// Starting point for settings written in $EDITOR
fn settings_template(summary: &SettingsSummary) -> String {
    let template: serde_json::Map<String, serde_json::Value> = summary
        .required
        .iter()
        .map(|key| (key.clone(), serde_json::Value::Null))
        .collect();
    serde_json::to_string_pretty(&template).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_template_lists_required_keys() {
        let summary = SettingsSummary {
            properties: vec!["region".to_string(), "lookback".to_string()],
            required: vec!["region".to_string()],
        };
        let template: serde_json::Value =
            serde_json::from_str(&settings_template(&summary)).unwrap();
        assert_eq!(template, serde_json::json!({"region": null}));
    }

    #[test]
    fn test_parse_stream_config() {
        let streams = parse_stream_config(r#"[{"name": "orders"}]"#).unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].name, "orders");

        assert!(parse_stream_config("[]").is_err());
        assert!(parse_stream_config("not json").is_err());
    }

    #[test]
    fn test_streams_from_edited_value() {
        let streams =
            streams_from_value(serde_json::json!([{"name": "orders", "full_sync_always": true}]))
                .unwrap();
        assert_eq!(streams[0].name, "orders");
        assert!(streams[0].full_sync_always);

        let err = streams_from_value(serde_json::json!([])).unwrap_err();
        assert_eq!(err.to_string(), "Select at least one stream");
        assert!(streams_from_value(serde_json::json!([{"title": "orders"}])).is_err());
    }
}
