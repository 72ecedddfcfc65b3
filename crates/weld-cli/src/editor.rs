//! $EDITOR round trips for JSON documents
//!
//! ELT settings (an object) and stream configuration (an array) are written
//! to a `.json` temp file, edited, and parsed back here. Content that fails
//! to parse comes back inside the error so the caller can keep the user's
//! text and show where it went wrong.

use std::fs;
use std::io::{self, Write};
use std::process::Command;

use serde_json::Value;
use thiserror::Error;

/// Top-level shape a document must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn name(self) -> &'static str {
        match self {
            JsonShape::Object => "object",
            JsonShape::Array => "array",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Object => value.is_object(),
            JsonShape::Array => value.is_array(),
        }
    }

    /// Document used when the user leaves the file blank
    fn empty(self) -> Value {
        match self {
            JsonShape::Object => Value::Object(Default::default()),
            JsonShape::Array => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("No editor found. Set $EDITOR, for example: export EDITOR=nano")]
    NoEditor,

    #[error("Failed to run editor '{editor}': {source}")]
    Launch { editor: String, source: io::Error },

    #[error("Editor '{0}' exited with non-zero status")]
    Failed(String),

    #[error("Temp file error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON: {source}")]
    InvalidJson {
        content: String,
        source: serde_json::Error,
    },

    #[error("Expected a JSON {expected}, got {found}")]
    WrongShape {
        content: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl EditError {
    /// The edited text, when the editor ran but the result was rejected
    pub fn content(&self) -> Option<&str> {
        match self {
            EditError::InvalidJson { content, .. } | EditError::WrongShape { content, .. } => {
                Some(content)
            }
            _ => None,
        }
    }
}

/// A document that parsed and has the requested shape
#[derive(Debug, Clone, PartialEq)]
pub struct EditedJson {
    /// Text as the user left it
    pub raw: String,
    pub value: Value,
}

/// Open `initial` in the user's editor and parse the result as `shape`
pub fn edit_json(initial: &str, shape: JsonShape) -> Result<EditedJson, EditError> {
    let editor = find_editor().ok_or(EditError::NoEditor)?;
    let raw = run_editor(&editor, initial)?;
    parse_document(raw, shape)
}

fn parse_document(raw: String, shape: JsonShape) -> Result<EditedJson, EditError> {
    if raw.trim().is_empty() {
        return Ok(EditedJson {
            raw,
            value: shape.empty(),
        });
    }

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(source) => return Err(EditError::InvalidJson { content: raw, source }),
    };
    if !shape.matches(&value) {
        return Err(EditError::WrongShape {
            content: raw,
            expected: shape.name(),
            found: kind(&value),
        });
    }
    Ok(EditedJson { raw, value })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Run `command` (program plus optional flags, like `code --wait`) on a temp copy of `initial`
fn run_editor(command: &str, initial: &str) -> Result<String, EditError> {
    let mut file = tempfile::Builder::new()
        .prefix("weld-connect-")
        .suffix(".json")
        .tempfile()?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;

    let mut parts = command.split_whitespace();
    let program = parts.next().ok_or(EditError::NoEditor)?;
    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .map_err(|source| EditError::Launch {
            editor: command.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(EditError::Failed(command.to_string()));
    }

    // Editors may replace the file rather than write through our handle
    Ok(fs::read_to_string(file.path())?)
}

/// $EDITOR, then $VISUAL, then the first common editor on PATH
fn find_editor() -> Option<String> {
    ["EDITOR", "VISUAL"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|editor| !editor.trim().is_empty())
        .or_else(|| {
            ["nano", "vim", "vi", "emacs"]
                .iter()
                .find(|editor| command_exists(editor))
                .map(|editor| editor.to_string())
        })
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
