//! Application state and logic

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};

use weld_core::api::CreateConnectionBridge;
use weld_core::poller::{spawn_sync_status_poller, PollerCommand, PollerConfig, PollerEvent, PollerHandle};
use weld_core::wizard::{ActiveStep, StatePatch, StepId, Wizard, WizardState};
use weld_core::{ApiClient, ApiError, AuthCallbackServer, Config, SettingsSummary, SyncForm};

use super::forms::{
    monitor_streams, AuthorizeForm, BridgeField, BridgeForm, CreateSyncForm, MonitorState,
    StartSyncForm, StreamsForm, SyncField, TextInput,
};

/// How long a status message stays visible
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Keys are shortcuts
    Normal,
    /// Keys go into the focused text field
    Editing,
}

/// API key validation state shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionIndicator {
    Validating,
    Connected,
    NotConnected,
}

/// Content handed to $EDITOR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorTask {
    /// ELT settings JSON object
    Settings,
    /// Raw stream configuration array
    StreamConfig,
}

/// Work that talks to the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiTask {
    ValidateConnection,
    CreateBridge,
    CreateSync,
    AddStreams,
    EnableSync,
    DisableSync,
    RefreshSync,
    RequestRun(String),
    RequestFullRefresh(String),
}

impl ApiTask {
    /// Shown in the status bar while the request is in flight
    pub fn label(&self) -> &'static str {
        match self {
            ApiTask::ValidateConnection => "Validating API key...",
            ApiTask::CreateBridge => "Creating connection bridge...",
            ApiTask::CreateSync => "Creating ELT sync...",
            ApiTask::AddStreams => "Adding streams...",
            ApiTask::EnableSync => "Enabling sync...",
            ApiTask::DisableSync => "Disabling sync...",
            ApiTask::RefreshSync => "Refreshing sync...",
            ApiTask::RequestRun(_) => "Requesting run...",
            ApiTask::RequestFullRefresh(_) => "Requesting full refresh...",
        }
    }
}

/// What the event loop should do after a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Editor(EditorTask),
    Api(ApiTask),
    Reset,
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    pub config: Config,
    client: Option<ApiClient>,
    pub wizard: Wizard,
    pub connection: ConnectionIndicator,
    /// API key being typed, when the key prompt is open
    pub api_key_input: Option<TextInput>,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    pub status_is_error: bool,
    /// Request in flight
    pub busy: Option<&'static str>,
    /// Whether help overlay is visible
    pub show_help: bool,

    pub bridge: BridgeForm,
    pub authorize: AuthorizeForm,
    pub create_sync: CreateSyncForm,
    pub streams: StreamsForm,
    pub start: StartSyncForm,
    pub monitor: MonitorState,

    /// Listener for the authorization redirect; lives through the authorize step
    pub auth_server: Option<AuthCallbackServer>,
    /// Status poller; lives only on the monitor step
    pub poller: Option<PollerHandle>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let client = ApiClient::from_config(&config).ok();
        let wizard = Wizard::new(WizardState::seeded(config.connection_id.clone()));
        let connection = if client.is_some() {
            ConnectionIndicator::Validating
        } else {
            ConnectionIndicator::NotConnected
        };

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            client,
            wizard,
            connection,
            api_key_input: None,
            status_message: None,
            status_message_time: None,
            status_is_error: false,
            busy: None,
            show_help: false,
            bridge: BridgeForm::new(&config.connection_label),
            authorize: AuthorizeForm::default(),
            create_sync: CreateSyncForm::new(SyncForm::new(None, Utc::now())),
            streams: StreamsForm::default(),
            start: StartSyncForm::default(),
            monitor: MonitorState::default(),
            auth_server: None,
            poller: None,
            config,
        }
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
        self.status_is_error = false;
    }

    /// Set an error message in the status line
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.set_status(message);
        self.status_is_error = true;
    }

    fn set_api_error(&mut self, context: &str, error: &ApiError) {
        warn!("{}: {}", context, error);
        if error.is_auth_failure() {
            self.connection = ConnectionIndicator::NotConnected;
        }
        self.set_error(format!("{}: {}", context, error));
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
                self.status_is_error = false;
            }
        }
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn current_step(&self) -> StepId {
        self.wizard.current_step().id
    }

    /// Whether the current step is blocked on missing state
    pub fn is_blocked(&self) -> bool {
        matches!(self.wizard.active(), ActiveStep::Blocked { .. })
    }

    /// Text field that receives keys in editing mode
    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        if self.api_key_input.is_some() {
            return self.api_key_input.as_mut();
        }
        match self.current_step() {
            StepId::CreateConnectionBridge if self.bridge.focus == BridgeField::Label => {
                Some(&mut self.bridge.label)
            }
            StepId::AuthorizeConnection => Some(&mut self.authorize.connection_id),
            StepId::CreateEltSync => self.create_sync.focused_input(),
            _ => None,
        }
    }

    /// Open the API key prompt
    pub fn begin_api_key_entry(&mut self) {
        self.api_key_input = Some(TextInput::default());
        self.input_mode = InputMode::Editing;
    }

    /// Close the API key prompt; returns true when a new client was built
    pub fn finish_api_key_entry(&mut self, accept: bool) -> bool {
        self.input_mode = InputMode::Normal;
        let Some(input) = self.api_key_input.take() else {
            return false;
        };
        if !accept {
            return false;
        }

        match ApiClient::new(self.config.base_url.clone(), input.value()) {
            Ok(client) => {
                self.config.api_key = Some(input.value().trim().to_string());
                self.client = Some(client);
                true
            }
            Err(e) => {
                self.client = None;
                self.connection = ConnectionIndicator::NotConnected;
                self.set_error(e.to_string());
                false
            }
        }
    }

    /// Back to normal mode, committing typed text
    pub fn leave_editing(&mut self) {
        self.input_mode = InputMode::Normal;
        if self.current_step() == StepId::CreateEltSync {
            self.create_sync.sync_inputs();
            if self.create_sync.focus == SyncField::Schema {
                self.create_sync.blur_schema();
            }
        }
    }

    /// Whether the current step already fetched what it shows
    fn step_loaded(&self) -> bool {
        match self.current_step() {
            StepId::CreateConnectionBridge | StepId::AuthorizeConnection => true,
            StepId::CreateEltSync => self.create_sync.loaded,
            StepId::AddSourceStreams => self.streams.loaded,
            StepId::StartSync => self.start.sync.is_some(),
            StepId::MonitorSync => self.poller.is_some(),
        }
    }

    /// Record success of the current step
    fn complete(&mut self, patch: StatePatch) {
        self.wizard.complete(patch);
    }

    /// Start over from the first step
    pub async fn reset(&mut self) {
        self.wizard.reset();
        let integrations = std::mem::take(&mut self.bridge.integrations);
        self.bridge = BridgeForm::new(&self.config.connection_label);
        self.bridge.integrations = integrations;
        self.authorize = AuthorizeForm::default();
        self.streams = StreamsForm::default();
        self.start = StartSyncForm::default();
        self.monitor = MonitorState::default();
        self.auth_server = None;
        self.poller = None;
        self.input_mode = InputMode::Normal;
        self.set_status("Wizard reset");
        self.enter_step().await;
    }

    /// Prepare the current step: release other steps' background work, load data
    pub async fn enter_step(&mut self) {
        let step = self.current_step();
        info!(?step, "entering step");

        if step != StepId::AuthorizeConnection && step != StepId::CreateConnectionBridge {
            self.auth_server = None;
            self.authorize.listening = false;
        }
        if step != StepId::MonitorSync {
            self.poller = None;
            self.monitor.polling = false;
        }

        if self.is_blocked() {
            return;
        }
        if step == StepId::CreateEltSync {
            let integration_id = self.wizard.state().integration_id.clone();
            self.create_sync =
                CreateSyncForm::new(SyncForm::new(integration_id.as_deref(), Utc::now()));
        }
        let Some(client) = self.client.clone() else {
            return;
        };

        match step {
            // Integrations come with the API key check
            StepId::CreateConnectionBridge | StepId::AuthorizeConnection => {}
            StepId::CreateEltSync => self.load_settings(&client).await,
            StepId::AddSourceStreams => self.load_streams(&client).await,
            StepId::StartSync => self.refresh_sync(&client).await,
            StepId::MonitorSync => {
                self.refresh_sync(&client).await;
                self.start_polling(&client);
            }
        }
    }

    /// Run an API task; advances and enters the next step on success
    pub async fn perform(&mut self, task: ApiTask) {
        let Some(client) = self.client.clone() else {
            self.set_error("No API key. Press K to enter one.");
            return;
        };
        let step_before = self.wizard.current_index();

        match task {
            ApiTask::ValidateConnection => {
                self.validate_connection(&client).await;
                if self.connection == ConnectionIndicator::Connected && !self.step_loaded() {
                    self.enter_step().await;
                }
            }
            ApiTask::CreateBridge => self.create_bridge(&client).await,
            ApiTask::CreateSync => self.create_sync(&client).await,
            ApiTask::AddStreams => self.add_streams(&client).await,
            ApiTask::EnableSync => self.enable_sync(&client).await,
            ApiTask::DisableSync => self.disable_sync(&client).await,
            ApiTask::RefreshSync => self.refresh_sync(&client).await,
            ApiTask::RequestRun(stream_id) => {
                match client.request_run(&stream_id).await {
                    Ok(()) => self.set_status("Run requested"),
                    Err(e) => self.set_api_error("Failed to request run", &e),
                }
                self.poller_command(PollerCommand::Refresh).await;
            }
            ApiTask::RequestFullRefresh(stream_id) => {
                match client.request_full_refresh(&stream_id).await {
                    Ok(()) => self.set_status("Full refresh requested"),
                    Err(e) => self.set_api_error("Failed to request full refresh", &e),
                }
                self.poller_command(PollerCommand::Refresh).await;
            }
        }

        if self.wizard.current_index() != step_before {
            self.enter_step().await;
        }
    }

    /// List integrations; doubles as the API key check
    async fn validate_connection(&mut self, client: &ApiClient) {
        self.connection = ConnectionIndicator::Validating;
        match client.list_integrations().await {
            Ok(list) => {
                self.connection = ConnectionIndicator::Connected;
                if self.bridge.selected >= list.data.len() {
                    self.bridge.selected = 0;
                }
                self.bridge.integrations = list.data;
            }
            Err(e) => {
                self.connection = ConnectionIndicator::NotConnected;
                self.set_api_error("Not connected to Weld Connect API", &e);
            }
        }
    }

    async fn create_bridge(&mut self, client: &ApiClient) {
        let Some(integration) = self.bridge.selected_integration().cloned() else {
            self.set_error("Select an integration first");
            return;
        };
        let label = self.bridge.label.value().trim().to_string();
        if label.is_empty() {
            self.set_error("Connection label cannot be empty");
            return;
        }

        if self.auth_server.is_none() {
            match AuthCallbackServer::start(self.config.callback_port).await {
                Ok(server) => self.auth_server = Some(server),
                Err(e) => {
                    warn!("{}", e);
                    self.set_error(format!("{}. Paste the connection id instead.", e));
                }
            }
        }
        let redirect_uri = self
            .auth_server
            .as_ref()
            .map(AuthCallbackServer::redirect_uri)
            .unwrap_or_else(|| self.config.redirect_uri());

        let request = CreateConnectionBridge {
            redirect_uri,
            label,
            integration_id: integration.id.clone(),
        };
        match client.create_connection_bridge(&request).await {
            Ok(bridge) => {
                self.authorize = AuthorizeForm {
                    listening: self.auth_server.is_some(),
                    ..AuthorizeForm::default()
                };
                self.set_status("Connection bridge created");
                self.complete(StatePatch::connection_bridge(bridge, integration.id));
            }
            Err(e) => self.set_api_error("Failed to create connection bridge", &e),
        }
    }

    /// Open the bridge's authorize URL in the browser
    pub fn open_authorize_url(&mut self) {
        let Some(url) = self
            .wizard
            .state()
            .connection_bridge
            .as_ref()
            .map(|bridge| bridge.authorize_url.clone())
        else {
            return;
        };
        match open::that(&url) {
            Ok(()) => {
                self.authorize.opened = true;
                self.set_status("Opened authorize URL in browser");
            }
            Err(e) => self.set_error(format!("Could not open browser: {}", e)),
        }
    }

    /// Complete authorization with a connection id from the callback or the user
    pub async fn authorize(&mut self, connection_id: String) {
        if self.current_step() != StepId::AuthorizeConnection || self.is_blocked() {
            return;
        }
        let connection_id = connection_id.trim().to_string();
        if connection_id.is_empty() {
            self.set_error("Connection id cannot be empty");
            return;
        }

        info!(%connection_id, "connection authorized");
        self.input_mode = InputMode::Normal;
        self.set_status("Connection authorized");
        self.complete(StatePatch::connection_id(connection_id));
        self.enter_step().await;
    }

    async fn load_settings(&mut self, client: &ApiClient) {
        let Some(connection_id) = self.wizard.state().connection_id.clone() else {
            return;
        };
        match client.get_elt_settings(&connection_id).await {
            Ok(schema) => {
                self.create_sync.summary = SettingsSummary::from_schema(&schema);
                self.create_sync.loaded = true;
            }
            Err(e) => self.set_api_error("Failed to load ELT settings", &e),
        }
    }

    async fn create_sync(&mut self, client: &ApiClient) {
        let Some(connection_id) = self.wizard.state().connection_id.clone() else {
            return;
        };
        self.create_sync.sync_inputs();
        self.create_sync.blur_schema();

        let request = match self
            .create_sync
            .form
            .to_request(&connection_id, &self.create_sync.summary)
        {
            Ok(request) => request,
            Err(e) => {
                self.set_error(e.to_string());
                return;
            }
        };

        match client.create_elt_sync(&request).await {
            Ok(sync) => {
                self.set_status(format!("ELT sync {} created", sync.id));
                self.complete(StatePatch::elt_sync(sync));
            }
            Err(e) => self.set_api_error("Failed to create ELT sync", &e),
        }
    }

    fn elt_sync_id(&self) -> Option<String> {
        self.wizard.state().elt_sync.as_ref().map(|s| s.id.clone())
    }

    async fn load_streams(&mut self, client: &ApiClient) {
        let Some(sync_id) = self.elt_sync_id() else {
            return;
        };
        match client.list_available_source_streams(&sync_id).await {
            Ok(list) => self.streams.load(list.data),
            Err(e) => self.set_api_error("Failed to load streams", &e),
        }
    }

    async fn add_streams(&mut self, client: &ApiClient) {
        let Some(sync_id) = self.elt_sync_id() else {
            return;
        };
        let params = match self.streams.editor.parse() {
            Ok(params) => params,
            Err(e) => {
                self.set_error(e.to_string());
                return;
            }
        };

        match client.add_source_streams(&sync_id, params).await {
            Ok(added) => {
                self.set_status(format!("Added {} stream(s)", added.source_streams.len()));
                self.complete(StatePatch::source_streams(added.source_streams));
            }
            Err(e) => self.set_api_error("Failed to add streams", &e),
        }
    }

    async fn refresh_sync(&mut self, client: &ApiClient) {
        let Some(sync_id) = self.elt_sync_id() else {
            return;
        };
        match client.get_elt_sync(&sync_id).await {
            Ok(sync) => {
                self.monitor.streams =
                    monitor_streams(Some(&sync), self.wizard.state().source_streams.as_ref());
                self.start.sync = Some(sync);
            }
            Err(e) => {
                if self.monitor.streams.is_empty() {
                    self.monitor.streams =
                        monitor_streams(None, self.wizard.state().source_streams.as_ref());
                }
                self.set_api_error("Failed to load sync", &e);
            }
        }
    }

    async fn enable_sync(&mut self, client: &ApiClient) {
        let Some(sync_id) = self.elt_sync_id() else {
            return;
        };
        let result = client.enable_sync(&sync_id).await;
        self.refresh_sync(client).await;
        match result {
            Ok(()) => {
                self.set_status("Sync enabled");
                self.complete(StatePatch::empty());
            }
            Err(e) => self.set_api_error("Failed to enable sync", &e),
        }
    }

    async fn disable_sync(&mut self, client: &ApiClient) {
        let Some(sync_id) = self.elt_sync_id() else {
            return;
        };
        let result = client.disable_sync(&sync_id).await;
        self.refresh_sync(client).await;
        match result {
            Ok(()) => self.set_status("Sync disabled"),
            Err(e) => self.set_api_error("Failed to disable sync", &e),
        }
    }

    fn start_polling(&mut self, client: &ApiClient) {
        if self.poller.is_some() {
            return;
        }
        let Some(sync_id) = self.elt_sync_id() else {
            return;
        };
        self.poller = Some(spawn_sync_status_poller(
            client.clone(),
            sync_id,
            PollerConfig::default(),
        ));
    }

    /// Send a command to the poller, if one is running
    pub async fn poller_command(&self, command: PollerCommand) {
        if let Some(ref poller) = self.poller {
            poller.send(command).await;
        }
    }

    pub fn on_poller_event(&mut self, event: PollerEvent) {
        match event {
            PollerEvent::Snapshot(status) => self.monitor.replace(status),
            PollerEvent::Error(message) => {
                warn!("status fetch failed: {}", message);
                self.monitor.last_error = Some(message);
            }
            PollerEvent::PollingChanged(polling) => self.monitor.polling = polling,
        }
    }

    /// Initial content for $EDITOR
    pub fn editor_seed(&self, task: EditorTask) -> String {
        match task {
            EditorTask::Settings => {
                let raw = self.create_sync.form.settings_raw.trim();
                if (raw.is_empty() || raw == "{}") && !self.create_sync.summary.required.is_empty() {
                    let template: serde_json::Map<String, serde_json::Value> = self
                        .create_sync
                        .summary
                        .required
                        .iter()
                        .map(|key| (key.clone(), serde_json::Value::Null))
                        .collect();
                    serde_json::to_string_pretty(&template).unwrap_or_else(|_| "{}".to_string())
                } else {
                    self.create_sync.form.settings_raw.clone()
                }
            }
            EditorTask::StreamConfig => self.streams.editor.raw().to_string(),
        }
    }

    /// Take content back from $EDITOR
    pub fn apply_editor_result(&mut self, task: EditorTask, content: String) {
        match task {
            EditorTask::Settings => {
                self.create_sync.form.settings_raw = content;
                match self.create_sync.validation_error() {
                    Some(message) => self.set_error(message),
                    None => self.set_status("Settings updated"),
                }
            }
            EditorTask::StreamConfig => {
                self.streams.editor.set_raw(content);
                if self.streams.editor.error().is_none() {
                    self.set_status("Stream configuration updated");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_key: Option<&str>, connection_id: Option<&str>) -> Config {
        Config {
            api_key: api_key.map(str::to_string),
            connection_id: connection_id.map(str::to_string),
            ..Config::default()
        }
    }

    #[test]
    fn test_new_without_key_is_not_connected() {
        let app = App::new(config(None, None));
        assert!(!app.has_client());
        assert_eq!(app.connection, ConnectionIndicator::NotConnected);
        assert_eq!(app.current_step(), StepId::CreateConnectionBridge);
    }

    #[test]
    fn test_seeded_connection_skips_to_create_sync() {
        let app = App::new(config(Some("key"), Some("conn_1")));
        assert!(app.has_client());
        assert_eq!(app.connection, ConnectionIndicator::Validating);
        assert_eq!(app.current_step(), StepId::CreateEltSync);
    }

    #[test]
    fn test_status_and_error_messages() {
        let mut app = App::new(config(None, None));
        app.set_error("boom");
        assert!(app.status_is_error);
        app.set_status("fine");
        assert!(!app.status_is_error);
        assert_eq!(app.status_message.as_deref(), Some("fine"));

        app.status_message_time = Some(Instant::now() - Duration::from_secs(5));
        app.check_status_timeout();
        assert!(app.status_message.is_none());
    }

    #[test]
    fn test_api_key_entry() {
        let mut app = App::new(config(None, None));
        app.begin_api_key_entry();
        assert_eq!(app.input_mode, InputMode::Editing);
        for c in "wk_123".chars() {
            app.focused_input().unwrap().insert_char(c);
        }
        assert!(app.finish_api_key_entry(true));
        assert!(app.has_client());
        assert_eq!(app.config.api_key.as_deref(), Some("wk_123"));

        app.begin_api_key_entry();
        assert!(!app.finish_api_key_entry(false));
        assert!(app.has_client());
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let mut app = App::new(config(None, None));
        app.begin_api_key_entry();
        assert!(!app.finish_api_key_entry(true));
        assert!(!app.has_client());
        assert!(app.status_is_error);
    }

    #[tokio::test]
    async fn test_authorize_from_paste_advances() {
        let mut app = App::new(config(None, None));
        // Reach the authorize step without a server round trip
        app.wizard.complete(StatePatch::connection_bridge(
            serde_json::from_value(serde_json::json!({
                "id": "br_1",
                "authorize_url": "https://example.com/auth"
            }))
            .unwrap(),
            "postgres",
        ));
        assert_eq!(app.current_step(), StepId::AuthorizeConnection);

        app.authorize("   ".to_string()).await;
        assert_eq!(app.current_step(), StepId::AuthorizeConnection);

        app.authorize(" conn_9 ".to_string()).await;
        assert_eq!(app.current_step(), StepId::CreateEltSync);
        assert_eq!(app.wizard.state().connection_id.as_deref(), Some("conn_9"));
        assert_eq!(app.create_sync.form.schema_name, "postgres");
    }

    #[tokio::test]
    async fn test_authorize_ignored_on_other_steps() {
        let mut app = App::new(config(None, None));
        app.authorize("conn".to_string()).await;
        assert_eq!(app.current_step(), StepId::CreateConnectionBridge);
        assert!(app.wizard.state().connection_id.is_none());
    }

    #[test]
    fn test_editor_seed_lists_required_settings() {
        let mut app = App::new(config(None, None));
        app.create_sync.summary = SettingsSummary {
            properties: vec!["region".to_string()],
            required: vec!["region".to_string()],
        };
        let seed: serde_json::Value =
            serde_json::from_str(&app.editor_seed(EditorTask::Settings)).unwrap();
        assert_eq!(seed, serde_json::json!({"region": null}));

        app.apply_editor_result(EditorTask::Settings, r#"{"region": "eu"}"#.to_string());
        assert!(!app.status_is_error);
        assert_eq!(app.editor_seed(EditorTask::Settings), r#"{"region": "eu"}"#);
    }

    /// App seeded with a connection and pointed at `server`
    fn wired_app(server: &MockServer) -> App {
        App::new(Config {
            base_url: server.uri(),
            ..config(Some("test-key"), Some("conn_1"))
        })
    }

    /// Advance a wired app to the start step without any requests
    fn at_start_step(app: &mut App) {
        let sync = serde_json::from_value(serde_json::json!({"id": "s1"})).unwrap();
        let streams =
            serde_json::from_value(serde_json::json!([{"id": "ss1", "name": "orders"}])).unwrap();
        app.wizard.complete(StatePatch::elt_sync(sync));
        app.wizard.complete(StatePatch::source_streams(streams));
        assert_eq!(app.current_step(), StepId::StartSync);
    }

    #[tokio::test]
    async fn test_create_sync_rejection_stays_on_step() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/elt_syncs"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"details": "schema name already in use"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut app = wired_app(&server);
        assert_eq!(app.wizard.current_index(), 2);
        app.create_sync.schema.set("warehouse".to_string());

        app.perform(ApiTask::CreateSync).await;

        assert_eq!(app.wizard.current_index(), 2);
        assert!(app.status_is_error);
        let message = app.status_message.clone().unwrap_or_default();
        assert!(message.contains("schema name already in use"), "{message}");
        assert!(app.wizard.state().elt_sync.is_none());
    }

    #[tokio::test]
    async fn test_enable_failure_still_refreshes_sync() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/elt_syncs/s1/enable"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elt_syncs/s1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "s1", "status": "NOT_STARTED"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut app = wired_app(&server);
        at_start_step(&mut app);

        app.perform(ApiTask::EnableSync).await;

        assert_eq!(app.current_step(), StepId::StartSync);
        assert!(app.status_is_error);
        assert!(app
            .status_message
            .as_deref()
            .unwrap_or_default()
            .starts_with("Failed to enable sync"));
        assert_eq!(app.start.sync.as_ref().map(|s| s.id.as_str()), Some("s1"));
    }

    #[tokio::test]
    async fn test_enable_success_moves_to_monitor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/elt_syncs/s1/enable"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elt_syncs/s1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "s1", "status": "RUNNING"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/elt_syncs/s1/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"elt_sync_id": "s1", "source_streams": []})),
            )
            .mount(&server)
            .await;

        let mut app = wired_app(&server);
        at_start_step(&mut app);

        app.perform(ApiTask::EnableSync).await;

        assert_eq!(app.wizard.current_index(), 5);
        assert_eq!(app.current_step(), StepId::MonitorSync);
        assert!(!app.status_is_error);
        assert!(app.poller.is_some());
    }
}
