//! Connection bridge command handlers

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::warn;

use weld_core::api::{ConnectionBridge, CreateConnectionBridge};
use weld_core::{ApiClient, AuthCallbackServer, Config};

use crate::output::{Output, OutputFormat};

/// How long `--wait` listens for the authorization callback
const AUTHORIZE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub struct BridgeOptions {
    pub integration: String,
    pub label: Option<String>,
    pub redirect_uri: Option<String>,
    pub wait: bool,
}

/// Create a connection bridge, optionally waiting for authorization
pub async fn create(
    client: &ApiClient,
    config: &Config,
    options: BridgeOptions,
    output: &Output,
) -> Result<()> {
    if options.wait && options.redirect_uri.is_some() {
        bail!("--wait listens on the local callback; it cannot be combined with --redirect-uri");
    }

    // Listen before creating the bridge so the redirect has somewhere to land
    let mut server = if options.wait {
        Some(
            AuthCallbackServer::start(config.callback_port)
                .await
                .context("Failed to start the authorization callback listener")?,
        )
    } else {
        None
    };

    let redirect_uri = match (&server, options.redirect_uri) {
        (Some(server), _) => server.redirect_uri(),
        (None, Some(uri)) => uri,
        (None, None) => config.redirect_uri(),
    };

    let request = CreateConnectionBridge {
        redirect_uri,
        label: options
            .label
            .unwrap_or_else(|| config.connection_label.clone()),
        integration_id: options.integration,
    };
    let bridge = client.create_connection_bridge(&request).await?;
    let Some(server) = server.as_mut() else {
        output.print_bridge(&bridge);
        return Ok(());
    };

    // Under --json the bridge is reported once, together with the connection
    if output.format != OutputFormat::Json {
        output.print_bridge(&bridge);
    }

    if let Err(e) = open::that(&bridge.authorize_url) {
        warn!("could not open browser: {}", e);
        progress(
            output,
            &format!("Open this URL in your browser: {}", bridge.authorize_url),
        );
    } else {
        progress(
            output,
            "Opened the authorize URL in your browser. Waiting for authorization...",
        );
    }

    let connection_id = server
        .wait_for_connection(AUTHORIZE_TIMEOUT)
        .await
        .context("Authorization did not complete")?;

    match output.format {
        OutputFormat::Json => {
            let document = authorized_bridge_json(&bridge, &connection_id)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Quiet => println!("{}", connection_id),
        OutputFormat::Human => {
            println!("✓ Connection authorized: {}", connection_id);
            println!();
            println!("Use it for new syncs with:");
            println!("  weld-connect config set connection_id {}", connection_id);
        }
    }
    Ok(())
}

/// Progress text while waiting; stderr under --json so stdout holds one document
fn progress(output: &Output, message: &str) {
    match output.format {
        OutputFormat::Json => eprintln!("{}", message),
        OutputFormat::Human | OutputFormat::Quiet => output.message(message),
    }
}

/// The bridge fields plus the connection it produced
fn authorized_bridge_json(bridge: &ConnectionBridge, connection_id: &str) -> Result<Value> {
    let mut document = serde_json::to_value(bridge).context("Failed to encode bridge")?;
    if let Value::Object(ref mut fields) = document {
        fields.insert(
            "connection_id".to_string(),
            Value::String(connection_id.to_string()),
        );
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authorized_bridge_is_one_document() {
        let bridge = ConnectionBridge {
            id: "br_1".to_string(),
            authorize_url: "https://connect.weld.app/authorize/br_1".to_string(),
            created_at: None,
            expires_at: Some("2024-03-09T15:00:00Z".to_string()),
        };
        let document = authorized_bridge_json(&bridge, "conn_42").unwrap();
        assert_eq!(
            document,
            json!({
                "id": "br_1",
                "authorize_url": "https://connect.weld.app/authorize/br_1",
                "created_at": null,
                "expires_at": "2024-03-09T15:00:00Z",
                "connection_id": "conn_42"
            })
        );
    }
}
