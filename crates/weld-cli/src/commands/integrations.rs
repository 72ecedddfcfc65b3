//! Integrations command handler

use anyhow::Result;

use weld_core::ApiClient;

use crate::output::Output;

/// List integrations a connection can be created for
pub async fn list(client: &ApiClient, output: &Output) -> Result<()> {
    let integrations = client.list_integrations().await?;
    output.print_integrations(&integrations.data);
    Ok(())
}
