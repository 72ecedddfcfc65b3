//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::Value;

use weld_core::api::{
    AvailableSourceStream, ConnectionBridge, EltSync, EltSyncStatus, Integration, JobStatus,
    SourceStream,
};
use weld_core::poller::stream_rows;
use weld_core::SettingsSummary;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print integrations
    pub fn print_integrations(&self, integrations: &[Integration]) {
        match self.format {
            OutputFormat::Human => {
                if integrations.is_empty() {
                    println!("No integrations available.");
                    return;
                }
                for integration in integrations {
                    match &integration.min_required_plan {
                        Some(plan) => println!(
                            "{:<28} {} (requires {})",
                            integration.id, integration.name, plan
                        ),
                        None => println!("{:<28} {}", integration.id, integration.name),
                    }
                }
                println!("\n{} integration(s)", integrations.len());
            }
            OutputFormat::Json => print_json(&integrations),
            OutputFormat::Quiet => {
                for integration in integrations {
                    println!("{}", integration.id);
                }
            }
        }
    }

    /// Print a newly created connection bridge
    pub fn print_bridge(&self, bridge: &ConnectionBridge) {
        match self.format {
            OutputFormat::Human => {
                println!("Bridge:    {}", bridge.id);
                println!("Authorize: {}", bridge.authorize_url);
                if let Some(ref expires) = bridge.expires_at {
                    println!("Expires:   {}", expires);
                }
            }
            OutputFormat::Json => print_json(bridge),
            OutputFormat::Quiet => println!("{}", bridge.authorize_url),
        }
    }

    /// Print a sync
    pub fn print_sync(&self, sync: &EltSync) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", sync.id);
                println!("Status:      {}", sync.status);
                if let Some(active) = sync.active {
                    println!("Enabled:     {}", if active { "yes" } else { "no" });
                }
                println!("Schema:      {}", sync.destination_schema_name);
                println!("Interval:    {}", sync.sync_interval);
                if let Some(ref start) = sync.start_date {
                    println!("Start date:  {}", start);
                }
                if let Some(ref conn) = sync.source_connection_id {
                    println!("Connection:  {}", conn);
                }
                if !sync.streams.is_empty() {
                    println!();
                    println!("── Streams ({}) ──", sync.streams.len());
                    for stream in &sync.streams {
                        println!("{}  {}", stream.id, stream.name);
                    }
                }
            }
            OutputFormat::Json => print_json(sync),
            OutputFormat::Quiet => println!("{}", sync.id),
        }
    }

    /// Print per-stream status, joining stream ids from `streams`
    pub fn print_status(&self, status: &EltSyncStatus, streams: &[SourceStream]) {
        match self.format {
            OutputFormat::Human => {
                if status.source_streams.is_empty() {
                    println!("No stream status yet.");
                    return;
                }
                println!(
                    "{:<28} {:<38} {:<38} {}",
                    "STREAM", "ACTIVE", "LATEST", "ID"
                );
                for row in stream_rows(status, streams) {
                    println!(
                        "{:<28} {:<38} {:<38} {}",
                        truncate(&row.name, 28),
                        job_summary(row.active_sync.as_ref()),
                        job_summary(row.latest_sync.as_ref()),
                        row.stream_id.as_deref().unwrap_or("-")
                    );
                }
            }
            OutputFormat::Json => print_json(status),
            OutputFormat::Quiet => {
                for stream in &status.source_streams {
                    let state = stream
                        .active_sync
                        .as_ref()
                        .or(stream.latest_sync.as_ref())
                        .map(|job| job.status.label())
                        .unwrap_or("-");
                    println!("{}\t{}", stream.name, state);
                }
            }
        }
    }

    /// Print streams available for a sync
    pub fn print_available_streams(&self, streams: &[AvailableSourceStream]) {
        match self.format {
            OutputFormat::Human => {
                if streams.is_empty() {
                    println!("No streams available.");
                    return;
                }
                for stream in streams {
                    let marker = if !stream.is_selectable {
                        " (not selectable)"
                    } else if stream.preselect {
                        " (suggested)"
                    } else {
                        ""
                    };
                    println!("{}{}", stream.name, marker);
                }
                println!("\n{} stream(s)", streams.len());
            }
            OutputFormat::Json => print_json(&streams),
            OutputFormat::Quiet => {
                for stream in streams {
                    println!("{}", stream.name);
                }
            }
        }
    }

    /// Print streams added to a sync
    pub fn print_source_streams(&self, streams: &[SourceStream]) {
        match self.format {
            OutputFormat::Human => {
                for stream in streams {
                    println!("{}  {}", stream.id, stream.name);
                }
                println!("\n{} stream(s) added", streams.len());
            }
            OutputFormat::Json => print_json(&streams),
            OutputFormat::Quiet => {
                for stream in streams {
                    println!("{}", stream.id);
                }
            }
        }
    }

    /// Print an ELT settings schema
    pub fn print_settings_schema(&self, schema: &Value) {
        match self.format {
            OutputFormat::Human => {
                let summary = SettingsSummary::from_schema(schema);
                if summary.is_empty() {
                    println!("No ELT settings required for this integration.");
                    return;
                }
                println!("Settings:");
                for name in &summary.properties {
                    let required = if summary.required.contains(name) {
                        " (required)"
                    } else {
                        ""
                    };
                    println!("  {}{}", name, required);
                }
                println!();
                print_json(schema);
            }
            OutputFormat::Json => print_json(schema),
            OutputFormat::Quiet => {
                for name in SettingsSummary::from_schema(schema).properties {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// One-cell summary of a job: status word, records and bytes
pub fn job_summary(job: Option<&JobStatus>) -> String {
    let Some(job) = job else {
        return "-".to_string();
    };

    let mut parts = vec![job.status.label().to_string()];
    match (job.records_synced, job.estimated_total_count) {
        (Some(done), Some(total)) if total > 0 => parts.push(format!("{}/{} rows", done, total)),
        (Some(done), _) => parts.push(format!("{} rows", done)),
        _ => {}
    }
    if job.bytes_synced > 0 {
        parts.push(format_bytes(job.bytes_synced));
    }
    parts.join(" · ")
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Truncate a string to max length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_core::api::RunStatus;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_job_summary() {
        assert_eq!(job_summary(None), "-");

        let job = JobStatus {
            status: RunStatus::Running,
            records_synced: Some(120),
            estimated_total_count: Some(400),
            bytes_synced: 2048,
            ..JobStatus::default()
        };
        assert_eq!(job_summary(Some(&job)), "running · 120/400 rows · 2.0 KB");

        let job = JobStatus {
            status: RunStatus::Completed,
            records_synced: Some(7),
            ..JobStatus::default()
        };
        assert_eq!(job_summary(Some(&job)), "completed · 7 rows");
    }
}
