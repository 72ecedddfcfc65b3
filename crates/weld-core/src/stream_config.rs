//! Source stream selection and raw configuration
//!
//! The add-streams step keeps two views in sync: the set of selected stream
//! names and a hand-editable JSON array of [`SourceStreamParam`]. Toggling a
//! stream edits the JSON; editing the JSON re-derives the selection. Parse
//! failures are kept as an inline validation error instead of being raised.

use thiserror::Error;

use crate::api::{AvailableSourceStream, SourceStreamParam};

/// Client-side validation failures for the stream configuration
#[derive(Error, Debug)]
pub enum StreamConfigError {
    /// The raw configuration is not a JSON array of stream configs
    #[error("Error parsing config: {0}")]
    Parse(String),

    /// Nothing to submit
    #[error("Select at least one stream")]
    Empty,
}

/// Editor state for the stream configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfigEditor {
    selected: Vec<String>,
    raw: String,
    error: Option<String>,
}

impl Default for StreamConfigEditor {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
            raw: "[]".to_string(),
            error: None,
        }
    }
}

impl StreamConfigEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the available streams, preselecting the first one
    pub fn from_available(available: &[AvailableSourceStream]) -> Self {
        let mut editor = Self::new();
        if let Some(first) = available.first() {
            editor.add(&first.name);
        }
        editor
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Inline validation message for the raw configuration
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|s| s == name)
    }

    /// Select or deselect a stream
    pub fn toggle(&mut self, name: &str) {
        if self.is_selected(name) {
            self.remove(name);
        } else {
            self.add(name);
        }
    }

    /// Select a stream and append an empty config entry for it
    pub fn add(&mut self, name: &str) {
        if self.is_selected(name) {
            return;
        }
        self.selected.push(name.to_string());

        match parse_raw(&self.raw) {
            Ok(mut config) => {
                config.push(SourceStreamParam::empty(name));
                self.write_raw(&config);
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Deselect a stream and drop its config entry
    pub fn remove(&mut self, name: &str) {
        self.selected.retain(|s| s != name);

        match parse_raw(&self.raw) {
            Ok(config) => {
                if config.iter().any(|s| s.name == name) {
                    let remaining: Vec<_> = config.into_iter().filter(|s| s.name != name).collect();
                    self.write_raw(&remaining);
                }
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Replace the raw configuration with hand-edited text
    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
        match parse_raw(&self.raw) {
            Ok(config) => {
                self.selected = config.into_iter().map(|s| s.name).collect();
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Whether the current configuration may be submitted
    pub fn can_submit(&self) -> bool {
        let trimmed = self.raw.trim();
        self.error.is_none() && !trimmed.is_empty() && trimmed != "[]"
    }

    /// Parse the configuration for submission
    pub fn parse(&self) -> Result<Vec<SourceStreamParam>, StreamConfigError> {
        let config = parse_raw(&self.raw)?;
        if config.is_empty() {
            return Err(StreamConfigError::Empty);
        }
        Ok(config)
    }

    fn write_raw(&mut self, config: &[SourceStreamParam]) {
        match serde_json::to_string_pretty(config) {
            Ok(raw) => self.raw = raw,
            Err(e) => self.error = Some(e.to_string()),
        }
    }
}

fn parse_raw(raw: &str) -> Result<Vec<SourceStreamParam>, StreamConfigError> {
    serde_json::from_str(raw).map_err(|e| StreamConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(names: &[&str]) -> Vec<AvailableSourceStream> {
        names
            .iter()
            .map(|name| AvailableSourceStream {
                name: name.to_string(),
                is_selectable: true,
                preselect: false,
                sub_streams: None,
            })
            .collect()
    }

    #[test]
    fn test_new_editor_cannot_submit() {
        let editor = StreamConfigEditor::new();
        assert_eq!(editor.raw(), "[]");
        assert!(!editor.can_submit());
        assert!(matches!(editor.parse(), Err(StreamConfigError::Empty)));
    }

    #[test]
    fn test_first_stream_preselected() {
        let editor = StreamConfigEditor::from_available(&available(&["orders", "users"]));
        assert_eq!(editor.selected(), &["orders".to_string()]);
        assert!(editor.can_submit());
        let parsed = editor.parse().unwrap();
        assert_eq!(parsed, vec![SourceStreamParam::empty("orders")]);
    }

    #[test]
    fn test_toggle_adds_and_removes_config() {
        let mut editor = StreamConfigEditor::new();
        editor.toggle("orders");
        editor.toggle("users");
        assert_eq!(editor.parse().unwrap().len(), 2);

        editor.toggle("orders");
        assert_eq!(editor.selected(), &["users".to_string()]);
        let parsed = editor.parse().unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "users");
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut editor = StreamConfigEditor::new();
        editor.add("orders");
        editor.add("orders");
        assert_eq!(editor.selected().len(), 1);
        assert_eq!(editor.parse().unwrap().len(), 1);
    }

    #[test]
    fn test_raw_edit_rederives_selection() {
        let mut editor = StreamConfigEditor::new();
        editor.set_raw(r#"[{"name": "invoices", "full_sync_always": true}]"#);
        assert_eq!(editor.selected(), &["invoices".to_string()]);
        assert!(editor.error().is_none());
        assert!(editor.parse().unwrap()[0].full_sync_always);
    }

    #[test]
    fn test_malformed_raw_reports_inline_error() {
        let mut editor = StreamConfigEditor::from_available(&available(&["orders"]));
        editor.set_raw("[{\"name\": ");
        assert!(editor.error().unwrap().starts_with("Error parsing config"));
        assert!(!editor.can_submit());
        // Selection is left as it was
        assert_eq!(editor.selected(), &["orders".to_string()]);

        // Fixing the text clears the error
        editor.set_raw("[]");
        assert!(editor.error().is_none());
        assert!(editor.selected().is_empty());
    }

    #[test]
    fn test_toggle_with_broken_raw_keeps_text() {
        let mut editor = StreamConfigEditor::new();
        editor.set_raw("not json");
        editor.toggle("orders");
        assert!(editor.is_selected("orders"));
        assert_eq!(editor.raw(), "not json");
        assert!(editor.error().is_some());
    }
}
