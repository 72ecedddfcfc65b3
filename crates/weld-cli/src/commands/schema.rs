//! Schema name command handler

use anyhow::{bail, Result};

use weld_core::destination_schema_name;

use crate::output::{Output, OutputFormat};

/// Print the destination schema name derived from `text`
pub fn name(text: &str, output: &Output) -> Result<()> {
    let name = destination_schema_name(text);
    if name.is_empty() {
        bail!("'{}' has no characters usable in a schema name", text);
    }

    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "schema_name": name })),
        OutputFormat::Human | OutputFormat::Quiet => println!("{}", name),
    }
    Ok(())
}
