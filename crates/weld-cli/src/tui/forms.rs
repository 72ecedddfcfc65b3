//! Per-step form state
//!
//! Each wizard step owns one of these while it is active. They hold only
//! what the user is editing; results go into the wizard state on success.

use weld_core::api::{AvailableSourceStream, EltSync, EltSyncStatus, Integration, SourceStream};
use weld_core::poller::{stream_rows, StreamRow};
use weld_core::{SettingsSummary, StreamConfigEditor, SyncForm};

/// Single-line text field with a cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    /// Cursor position in characters
    cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, value: impl Into<String>) {
        *self = Self::new(value);
    }

    /// Insert character at cursor position
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

/// Fields of the bridge form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeField {
    Integration,
    Label,
}

/// Step 0: pick an integration and label
#[derive(Debug, Clone)]
pub struct BridgeForm {
    pub integrations: Vec<Integration>,
    pub selected: usize,
    pub label: TextInput,
    pub focus: BridgeField,
}

impl BridgeForm {
    pub fn new(label: &str) -> Self {
        Self {
            integrations: Vec::new(),
            selected: 0,
            label: TextInput::new(label),
            focus: BridgeField::Integration,
        }
    }

    pub fn selected_integration(&self) -> Option<&Integration> {
        self.integrations.get(self.selected)
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.integrations.len() {
            self.selected += 1;
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            BridgeField::Integration => BridgeField::Label,
            BridgeField::Label => BridgeField::Integration,
        };
    }

    pub fn can_submit(&self) -> bool {
        self.selected_integration().is_some() && !self.label.value().trim().is_empty()
    }
}

/// Step 1: wait for the callback or a pasted connection id
#[derive(Debug, Clone, Default)]
pub struct AuthorizeForm {
    pub connection_id: TextInput,
    /// Whether the callback listener is running
    pub listening: bool,
    pub opened: bool,
}

/// Fields of the create sync form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncField {
    Settings,
    Interval,
    StartDate,
    Schema,
}

impl SyncField {
    pub fn next(self) -> Self {
        match self {
            SyncField::Settings => SyncField::Interval,
            SyncField::Interval => SyncField::StartDate,
            SyncField::StartDate => SyncField::Schema,
            SyncField::Schema => SyncField::Settings,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SyncField::Settings => SyncField::Schema,
            SyncField::Interval => SyncField::Settings,
            SyncField::StartDate => SyncField::Interval,
            SyncField::Schema => SyncField::StartDate,
        }
    }

    /// Whether the field takes typed text
    pub fn is_text(self) -> bool {
        matches!(self, SyncField::StartDate | SyncField::Schema)
    }
}

/// Step 2: ELT settings, interval, start date and schema name
#[derive(Debug, Clone)]
pub struct CreateSyncForm {
    pub form: SyncForm,
    pub summary: SettingsSummary,
    /// Settings schema has been fetched
    pub loaded: bool,
    pub focus: SyncField,
    pub start_date: TextInput,
    pub schema: TextInput,
}

impl CreateSyncForm {
    pub fn new(form: SyncForm) -> Self {
        let start_date = TextInput::new(form.start_date.clone());
        let schema = TextInput::new(form.schema_name.clone());
        Self {
            form,
            summary: SettingsSummary::default(),
            loaded: false,
            focus: SyncField::Settings,
            start_date,
            schema,
        }
    }

    /// Move focus, normalizing the schema name when it loses focus
    pub fn focus(&mut self, field: SyncField) {
        if self.focus == SyncField::Schema && field != SyncField::Schema {
            self.blur_schema();
        }
        self.focus = field;
    }

    pub fn blur_schema(&mut self) {
        self.form.schema_name = self.schema.value().to_string();
        self.form.blur_schema_name();
        self.schema.set(self.form.schema_name.clone());
    }

    /// Copy typed text into the form
    pub fn sync_inputs(&mut self) {
        self.form.start_date = self.start_date.value().to_string();
        self.form.schema_name = self.schema.value().to_string();
    }

    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            SyncField::StartDate => Some(&mut self.start_date),
            SyncField::Schema => Some(&mut self.schema),
            SyncField::Settings | SyncField::Interval => None,
        }
    }

    /// Validation message shown under the form, if any
    pub fn validation_error(&self) -> Option<String> {
        self.form.validate(&self.summary).err().map(|e| e.to_string())
    }
}

/// Step 3: choose streams
#[derive(Debug, Clone, Default)]
pub struct StreamsForm {
    pub available: Vec<AvailableSourceStream>,
    pub loaded: bool,
    pub cursor: usize,
    pub editor: StreamConfigEditor,
}

impl StreamsForm {
    pub fn load(&mut self, available: Vec<AvailableSourceStream>) {
        self.editor = StreamConfigEditor::from_available(&available);
        self.available = available;
        self.cursor = 0;
        self.loaded = true;
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.available.len() {
            self.cursor += 1;
        }
    }

    /// Toggle the stream under the cursor; unselectable streams are skipped
    pub fn toggle_current(&mut self) -> bool {
        match self.available.get(self.cursor) {
            Some(stream) if stream.is_selectable => {
                let name = stream.name.clone();
                self.editor.toggle(&name);
                true
            }
            _ => false,
        }
    }
}

/// Step 4: enable or disable the sync
#[derive(Debug, Clone, Default)]
pub struct StartSyncForm {
    pub sync: Option<EltSync>,
}

impl StartSyncForm {
    fn status(&self) -> weld_core::api::RunStatus {
        self.sync.as_ref().map(|s| s.status).unwrap_or_default()
    }

    /// Start is offered unless the sync is already running
    pub fn can_start(&self) -> bool {
        self.sync.is_some() && self.status() != weld_core::api::RunStatus::Running
    }

    /// Stop is only shown once the sync has ever run
    pub fn shows_stop(&self) -> bool {
        self.sync.is_some() && self.status() != weld_core::api::RunStatus::NotStarted
    }

    /// Stop is only enabled while running
    pub fn can_stop(&self) -> bool {
        self.shows_stop() && self.status() == weld_core::api::RunStatus::Running
    }
}

/// Step 5: status table
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub status: Option<EltSyncStatus>,
    /// Streams used to resolve row ids
    pub streams: Vec<SourceStream>,
    pub polling: bool,
    pub selected: usize,
    pub last_error: Option<String>,
}

impl MonitorState {
    pub fn rows(&self) -> Vec<StreamRow> {
        self.status
            .as_ref()
            .map(|status| stream_rows(status, &self.streams))
            .unwrap_or_default()
    }

    pub fn selected_row(&self) -> Option<StreamRow> {
        self.rows().into_iter().nth(self.selected)
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let len = self.status.as_ref().map_or(0, |s| s.source_streams.len());
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    /// Replace the snapshot, keeping the selection in range
    pub fn replace(&mut self, status: EltSyncStatus) {
        let len = status.source_streams.len();
        self.status = Some(status);
        self.last_error = None;
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

/// Streams from the sync itself, falling back to those added in the wizard
pub fn monitor_streams(sync: Option<&EltSync>, added: Option<&Vec<SourceStream>>) -> Vec<SourceStream> {
    match sync {
        Some(sync) if !sync.streams.is_empty() => sync.streams.clone(),
        _ => added.cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use weld_core::api::{RunStatus, StreamStatus};

    fn sync_with_status(status: &str) -> EltSync {
        serde_json::from_value(json!({"id": "s1", "status": status})).unwrap()
    }

    fn available(name: &str, selectable: bool) -> AvailableSourceStream {
        AvailableSourceStream {
            name: name.to_string(),
            is_selectable: selectable,
            preselect: false,
            sub_streams: None,
        }
    }

    #[test]
    fn test_text_input_editing() {
        let mut input = TextInput::new("ab");
        assert_eq!(input.cursor(), 2);
        input.cursor_left();
        input.insert_char('é');
        assert_eq!(input.value(), "aéb");
        input.cursor_right();
        input.delete_char();
        assert_eq!(input.value(), "aé");
        input.cursor_left();
        input.cursor_left();
        input.cursor_left();
        assert_eq!(input.cursor(), 0);
        input.delete_char();
        assert_eq!(input.value(), "aé");
    }

    #[test]
    fn test_bridge_form_requires_integration_and_label() {
        let mut form = BridgeForm::new("my-connection");
        assert!(!form.can_submit());

        form.integrations = vec![Integration {
            id: "postgres".to_string(),
            name: "PostgreSQL".to_string(),
            min_required_plan: None,
        }];
        assert!(form.can_submit());

        form.label.set("  ");
        assert!(!form.can_submit());
    }

    #[test]
    fn test_start_stop_gating() {
        let form = StartSyncForm {
            sync: Some(sync_with_status("NOT_STARTED")),
        };
        assert!(form.can_start());
        assert!(!form.shows_stop());

        let form = StartSyncForm {
            sync: Some(sync_with_status("RUNNING")),
        };
        assert!(!form.can_start());
        assert!(form.shows_stop());
        assert!(form.can_stop());

        let form = StartSyncForm {
            sync: Some(sync_with_status("COMPLETED")),
        };
        assert!(form.can_start());
        assert!(form.shows_stop());
        assert!(!form.can_stop());

        assert!(!StartSyncForm::default().can_start());
    }

    #[test]
    fn test_schema_blur_on_focus_change() {
        let mut form = CreateSyncForm::new(SyncForm::new(None, Utc::now()));
        form.focus(SyncField::Schema);
        for c in "my schema!".chars() {
            form.schema.insert_char(c);
        }
        form.focus(SyncField::Settings);
        assert_eq!(form.schema.value(), "my_schema");
        assert_eq!(form.form.schema_name, "my_schema");
    }

    #[test]
    fn test_streams_form_preselects_first_and_skips_unselectable() {
        let mut form = StreamsForm::default();
        form.load(vec![available("orders", true), available("locked", false)]);
        assert!(form.editor.is_selected("orders"));

        form.move_down();
        assert!(!form.toggle_current());
        assert!(!form.editor.is_selected("locked"));

        form.move_up();
        assert!(form.toggle_current());
        assert!(!form.editor.is_selected("orders"));
        assert!(!form.editor.can_submit());
    }

    #[test]
    fn test_monitor_selection_stays_in_range() {
        let mut monitor = MonitorState {
            selected: 3,
            ..MonitorState::default()
        };
        monitor.replace(EltSyncStatus {
            elt_sync_id: "s1".to_string(),
            source_streams: vec![StreamStatus {
                name: "orders".to_string(),
                active_sync: None,
                latest_sync: None,
            }],
        });
        assert_eq!(monitor.selected, 0);
        assert_eq!(monitor.selected_row().unwrap().name, "orders");
    }

    #[test]
    fn test_monitor_streams_fallback() {
        let added: Vec<SourceStream> =
            serde_json::from_value(json!([{"id": "st1", "name": "orders"}])).unwrap();
        let sync = sync_with_status("RUNNING");
        assert_eq!(monitor_streams(Some(&sync), Some(&added)), added);

        let sync: EltSync = serde_json::from_value(json!({
            "id": "s1",
            "source_streams": [{"id": "st9", "name": "users"}]
        }))
        .unwrap();
        assert_eq!(monitor_streams(Some(&sync), Some(&added))[0].id, "st9");
        assert_eq!(sync.status, RunStatus::NotStarted);
    }
}
