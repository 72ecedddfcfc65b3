//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use weld_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "base_url": config.base_url,
                    "api_key": config.api_key().map(mask_key),
                    "connection_id": config.connection_id,
                    "callback_port": config.callback_port,
                    "connection_label": config.connection_label,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.base_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  base_url:         {}", config.base_url);
            println!(
                "  api_key:          {}",
                config
                    .api_key()
                    .map(mask_key)
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!(
                "  connection_id:    {}",
                config.connection_id.as_deref().unwrap_or("(not set)")
            );
            println!("  callback_port:    {}", config.callback_port);
            println!("  connection_label: {}", config.connection_label);
            println!(
                "  log_file:         {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    // File values only; env overrides must not be written back
    let file_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    let mut config = Config::load_file_only(&file_path).context("Failed to load configuration")?;

    match key.as_str() {
        "base_url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                bail!("Invalid value for base_url. Use an http(s) URL.");
            }
            config.base_url = value.trim_end_matches('/').to_string();
        }
        "api_key" => {
            config.api_key = optional(&value);
        }
        "connection_id" => {
            config.connection_id = optional(&value);
        }
        "callback_port" => {
            config.callback_port = value
                .parse()
                .context("Invalid value for callback_port. Use a port number.")?;
        }
        "connection_label" => {
            if value.trim().is_empty() {
                bail!("connection_label cannot be empty");
            }
            config.connection_label = value.clone();
        }
        "log_file" => {
            config.log_file = optional(&value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: base_url, api_key, connection_id, callback_port, connection_label, log_file",
                key
            );
        }
    }

    match config_path {
        Some(path) => config.save_to_path(path),
        None => config.save(),
    }
    .context("Failed to save configuration")?;

    let shown = if key == "api_key" && !value.is_empty() && value != "none" {
        mask_key(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Empty string or "none" clears an optional key
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Show only the last four characters of an API key
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
