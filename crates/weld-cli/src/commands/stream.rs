//! Stream command handlers

use anyhow::Result;

use weld_core::ApiClient;

use crate::output::Output;

/// Request a run of one stream
pub async fn run(client: &ApiClient, stream_id: &str, output: &Output) -> Result<()> {
    client.request_run(stream_id).await?;
    output.success(&format!("Run requested for stream {}", stream_id));
    Ok(())
}

/// Request a full refresh of one stream
pub async fn full_refresh(client: &ApiClient, stream_id: &str, output: &Output) -> Result<()> {
    client.request_full_refresh(stream_id).await?;
    output.success(&format!("Full refresh requested for stream {}", stream_id));
    Ok(())
}
