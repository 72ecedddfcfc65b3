//! Status command handler

use anyhow::Result;

use weld_core::{ApiClient, Config};

use crate::output::{Output, OutputFormat};

/// Validate the API key against the service and report the setup
pub async fn show(client: &ApiClient, config: &Config, output: &Output) -> Result<()> {
    let result = client.list_integrations().await;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "base_url": client.base_url(),
                    "connected": result.is_ok(),
                    "error": result.as_ref().err().map(|e| e.to_string()),
                    "connection_id": config.connection_id,
                    "integrations": result.as_ref().map(|list| list.data.len()).ok()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", if result.is_ok() { "connected" } else { "not connected" });
        }
        OutputFormat::Human => {
            println!("Weld Connect Status");
            println!("===================");
            println!();
            println!("API:");
            println!("  URL:    {}", client.base_url());
            match &result {
                Ok(list) => {
                    println!("  Status: connected");
                    println!("  Integrations available: {}", list.data.len());
                }
                Err(e) => {
                    println!("  Status: not connected");
                    println!("  Error:  {}", e);
                    if let Some(hint) = e.suggestion() {
                        println!("  Hint:   {}", hint);
                    }
                }
            }
            println!();
            println!("Wizard:");
            println!(
                "  Connection: {}",
                config.connection_id.as_deref().unwrap_or("(not set)")
            );
            println!("  Callback:   {}", config.redirect_uri());
        }
    }

    result.map(|_| ()).map_err(Into::into)
}
