//! Weld Connect TUI
//!
//! Step-by-step wizard for creating and monitoring an ELT sync.
//!
//! ## Layout
//!
//! - Header: title and API key indicator
//! - Left: the six steps, with a ✓ and a summary once done
//! - Right: the current step's form, or the status table on the last step
//! - Bottom: key hints and status messages
//!
//! ## Keys
//!
//! - j/k or ↑/↓: Move selection
//! - Tab / Shift-Tab: Next / previous field
//! - Enter: Submit the current step
//! - e: Edit JSON in $EDITOR (settings, stream configuration)
//! - K: Enter API key
//! - c: Check API key
//! - Ctrl-R: Start over
//! - ?: Help
//! - q: Quit

mod app;
mod forms;
mod ui;

use std::fs::File;
use std::future::pending;
use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weld_core::poller::{PollerCommand, PollerEvent, PollerHandle};
use weld_core::{AuthCallbackServer, Config, StepId};

use app::{Action, ApiTask, App, EditorTask, InputMode};
use forms::BridgeField;

use crate::editor::{self, JsonShape};

/// Run the TUI application
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if WELD_LOG is set)
    init_tui_logging(&config);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(config);
    info!(step = ?app.current_step(), "wizard started");

    if app.has_client() {
        run_action(&mut terminal, &mut app, Action::Api(ApiTask::ValidateConnection)).await?;
    } else {
        app.set_error("No API key configured. Press K to enter one.");
    }

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

/// Output of the background sources the loop listens to
enum Background {
    Poller(Option<PollerEvent>),
    Authorized(Option<String>),
}

/// Wait for the poller or the callback listener, whichever is running
async fn next_background_event(
    poller: &mut Option<PollerHandle>,
    auth_server: &mut Option<AuthCallbackServer>,
) -> Background {
    tokio::select! {
        event = async move {
            match poller {
                Some(handle) => handle.event_rx.recv().await,
                None => pending().await,
            }
        } => Background::Poller(event),
        connection_id = async move {
            match auth_server {
                Some(server) => server.recv().await,
                None => pending().await,
            }
        } => Background::Authorized(connection_id),
    }
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        // Check for status message timeout
        app.check_status_timeout();

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Handle events with a short timeout
        tokio::select! {
            biased;

            background = next_background_event(&mut app.poller, &mut app.auth_server) => {
                match background {
                    Background::Poller(Some(event)) => app.on_poller_event(event),
                    Background::Poller(None) => {
                        app.poller = None;
                        app.monitor.polling = false;
                    }
                    Background::Authorized(Some(connection_id)) => {
                        app.authorize(connection_id).await;
                    }
                    Background::Authorized(None) => {
                        app.auth_server = None;
                        app.authorize.listening = false;
                    }
                }
            }

            // Poll for terminal events
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                // Check for terminal events (non-blocking)
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        // Only handle key press events (not release)
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }

                        // If help is showing, any key dismisses it
                        if app.show_help {
                            app.show_help = false;
                            continue;
                        }

                        let action = match app.input_mode {
                            InputMode::Normal => handle_normal_mode(app, key.code, key.modifiers).await,
                            InputMode::Editing => handle_editing_mode(app, key.code).await,
                        };
                        run_action(terminal, app, action).await?;
                    }
                }
            }
        }

        if app.should_quit {
            if let Some(poller) = app.poller.take() {
                poller.send(PollerCommand::Shutdown).await;
            }
            if let Some(server) = app.auth_server.take() {
                server.shutdown().await;
            }
            break;
        }
    }

    Ok(())
}

/// Carry out what a key press asked for
async fn run_action<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    action: Action,
) -> Result<()> {
    match action {
        Action::None => {}
        Action::Reset => app.reset().await,
        Action::Api(task) => {
            // Show the busy message before the request goes out
            app.busy = Some(task.label());
            terminal.draw(|frame| ui::draw(frame, app))?;
            app.perform(task).await;
            app.busy = None;
        }
        Action::Editor(task) => {
            let seed = app.editor_seed(task);
            let shape = match task {
                EditorTask::Settings => JsonShape::Object,
                EditorTask::StreamConfig => JsonShape::Array,
            };
            match with_suspended_terminal(terminal, || editor::edit_json(&seed, shape))? {
                Ok(edited) => app.apply_editor_result(task, edited.raw),
                Err(e) => {
                    // Keep rejected text so the user can fix it
                    if let Some(content) = e.content() {
                        app.apply_editor_result(task, content.to_string());
                    }
                    app.set_error(format!("Editor: {}", e));
                }
            }
        }
    }
    Ok(())
}

/// Leave the alternate screen while `f` runs, then restore the TUI
fn with_suspended_terminal<B: Backend, T>(
    terminal: &mut Terminal<B>,
    f: impl FnOnce() -> T,
) -> Result<T> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(cursor::Show)?;

    let result = f();

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    terminal.clear()?;

    Ok(result)
}

/// Handle key events in normal mode
async fn handle_normal_mode(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    // Global keys
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return Action::None;
        }
        KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => return Action::Reset,
        KeyCode::Char('q') => {
            app.should_quit = true;
            return Action::None;
        }
        KeyCode::Char('?') => {
            app.toggle_help();
            return Action::None;
        }
        KeyCode::Char('K') => {
            app.begin_api_key_entry();
            return Action::None;
        }
        KeyCode::Char('c') => return Action::Api(ApiTask::ValidateConnection),
        _ => {}
    }

    // A blocked step only offers reset
    if app.is_blocked() {
        return Action::None;
    }

    match app.current_step() {
        StepId::CreateConnectionBridge => match code {
            KeyCode::Char('j') | KeyCode::Down => app.bridge.move_down(),
            KeyCode::Char('k') | KeyCode::Up => app.bridge.move_up(),
            KeyCode::Tab | KeyCode::BackTab => {
                app.bridge.next_field();
                if app.bridge.focus == BridgeField::Label {
                    app.input_mode = InputMode::Editing;
                }
            }
            KeyCode::Enter => {
                if app.bridge.can_submit() {
                    return Action::Api(ApiTask::CreateBridge);
                }
                app.set_error("Select an integration and enter a label");
            }
            _ => {}
        },
        StepId::AuthorizeConnection => match code {
            KeyCode::Char('o') | KeyCode::Enter => app.open_authorize_url(),
            KeyCode::Char('p') | KeyCode::Tab => app.input_mode = InputMode::Editing,
            _ => {}
        },
        StepId::CreateEltSync => match code {
            KeyCode::Tab | KeyCode::BackTab => {
                let next = if code == KeyCode::Tab {
                    app.create_sync.focus.next()
                } else {
                    app.create_sync.focus.prev()
                };
                app.create_sync.focus(next);
                if next.is_text() {
                    app.input_mode = InputMode::Editing;
                }
            }
            KeyCode::Char('e') => return Action::Editor(EditorTask::Settings),
            KeyCode::Char(' ') => app.create_sync.form.next_interval(),
            KeyCode::Enter => {
                if !app.create_sync.loaded {
                    app.set_error("ELT settings are not loaded yet");
                    return Action::None;
                }
                match app.create_sync.validation_error() {
                    Some(message) => app.set_error(message),
                    None => return Action::Api(ApiTask::CreateSync),
                }
            }
            _ => {}
        },
        StepId::AddSourceStreams => match code {
            KeyCode::Char('j') | KeyCode::Down => app.streams.move_down(),
            KeyCode::Char('k') | KeyCode::Up => app.streams.move_up(),
            KeyCode::Char(' ') => {
                if !app.streams.toggle_current() {
                    app.set_error("This stream cannot be selected");
                }
            }
            KeyCode::Char('e') => return Action::Editor(EditorTask::StreamConfig),
            KeyCode::Enter => {
                if app.streams.editor.can_submit() {
                    return Action::Api(ApiTask::AddStreams);
                }
                let message = app
                    .streams
                    .editor
                    .error()
                    .unwrap_or("Select at least one stream")
                    .to_string();
                app.set_error(message);
            }
            _ => {}
        },
        StepId::StartSync => match code {
            KeyCode::Char('s') | KeyCode::Enter => {
                if app.start.can_start() {
                    return Action::Api(ApiTask::EnableSync);
                }
                if app.start.sync.is_none() {
                    app.set_error("Sync not loaded. Press r to refresh.");
                } else {
                    app.set_status("Sync is already running");
                }
            }
            KeyCode::Char('x') => {
                if app.start.can_stop() {
                    return Action::Api(ApiTask::DisableSync);
                }
            }
            KeyCode::Char('r') => return Action::Api(ApiTask::RefreshSync),
            _ => {}
        },
        StepId::MonitorSync => match code {
            KeyCode::Char('j') | KeyCode::Down => app.monitor.move_down(),
            KeyCode::Char('k') | KeyCode::Up => app.monitor.move_up(),
            KeyCode::Char('r') | KeyCode::Char('f') => {
                let Some(stream_id) = app.monitor.selected_row().and_then(|row| row.stream_id)
                else {
                    app.set_error("No stream id for the selected row yet");
                    return Action::None;
                };
                return if code == KeyCode::Char('r') {
                    Action::Api(ApiTask::RequestRun(stream_id))
                } else {
                    Action::Api(ApiTask::RequestFullRefresh(stream_id))
                };
            }
            KeyCode::Char('u') => app.poller_command(PollerCommand::Refresh).await,
            KeyCode::Char('a') if !app.monitor.polling => {
                app.poller_command(PollerCommand::Resume).await;
                app.set_status("Auto update for 1 minute");
            }
            KeyCode::Char('p') => app.poller_command(PollerCommand::Pause).await,
            _ => {}
        },
    }

    Action::None
}

/// Handle key events while a text field has focus
async fn handle_editing_mode(app: &mut App, code: KeyCode) -> Action {
    let api_key_prompt = app.api_key_input.is_some();

    match code {
        KeyCode::Esc => {
            if api_key_prompt {
                app.finish_api_key_entry(false);
            } else {
                app.leave_editing();
            }
        }
        KeyCode::Enter => {
            if api_key_prompt {
                if app.finish_api_key_entry(true) {
                    return Action::Api(ApiTask::ValidateConnection);
                }
                return Action::None;
            }
            if app.current_step() == StepId::AuthorizeConnection {
                let connection_id = app.authorize.connection_id.value().to_string();
                app.authorize(connection_id).await;
                return Action::None;
            }
            app.leave_editing();
        }
        KeyCode::Tab | KeyCode::BackTab if !api_key_prompt => match app.current_step() {
            StepId::CreateConnectionBridge => {
                app.bridge.next_field();
                app.input_mode = InputMode::Normal;
            }
            StepId::CreateEltSync => {
                app.create_sync.sync_inputs();
                let next = if code == KeyCode::Tab {
                    app.create_sync.focus.next()
                } else {
                    app.create_sync.focus.prev()
                };
                app.create_sync.focus(next);
                if !next.is_text() {
                    app.input_mode = InputMode::Normal;
                }
            }
            _ => app.leave_editing(),
        },
        KeyCode::Backspace => {
            if let Some(input) = app.focused_input() {
                input.delete_char();
            }
        }
        KeyCode::Left => {
            if let Some(input) = app.focused_input() {
                input.cursor_left();
            }
        }
        KeyCode::Right => {
            if let Some(input) = app.focused_input() {
                input.cursor_right();
            }
        }
        KeyCode::Char(c) => {
            if let Some(input) = app.focused_input() {
                input.insert_char(c);
            }
        }
        _ => {}
    }

    Action::None
}

/// Initialize file-based logging for TUI mode
fn init_tui_logging(config: &Config) {
    // Only log if WELD_LOG is set
    let Ok(log_level) = std::env::var("WELD_LOG") else {
        return;
    };

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("weld_core={},weld_connect={}", log_level, log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_core::StatePatch;

    fn app() -> App {
        App::new(Config {
            api_key: None,
            connection_id: None,
            ..Config::default()
        })
    }

    /// App past stream selection, on `step`
    fn app_at(step: StepId) -> App {
        let mut app = App::new(Config {
            api_key: None,
            connection_id: Some("conn_1".to_string()),
            ..Config::default()
        });
        let sync = serde_json::from_value(serde_json::json!({"id": "s1"})).unwrap();
        let streams =
            serde_json::from_value(serde_json::json!([{"id": "ss1", "name": "orders"}])).unwrap();
        app.wizard.complete(StatePatch::elt_sync(sync));
        app.wizard.complete(StatePatch::source_streams(streams));
        if step == StepId::MonitorSync {
            app.wizard.complete(StatePatch::empty());
        }
        assert_eq!(app.current_step(), step);
        app
    }

    #[tokio::test]
    async fn test_quit_and_help_keys() {
        let mut app = app();
        assert_eq!(
            handle_normal_mode(&mut app, KeyCode::Char('?'), KeyModifiers::NONE).await,
            Action::None
        );
        assert!(app.show_help);

        handle_normal_mode(&mut app, KeyCode::Char('q'), KeyModifiers::NONE).await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_ctrl_r_resets() {
        let mut app = app();
        assert_eq!(
            handle_normal_mode(&mut app, KeyCode::Char('r'), KeyModifiers::CONTROL).await,
            Action::Reset
        );
    }

    #[tokio::test]
    async fn test_bridge_submit_requires_integration() {
        let mut app = app();
        let action = handle_normal_mode(&mut app, KeyCode::Enter, KeyModifiers::NONE).await;
        assert_eq!(action, Action::None);
        assert!(app.status_is_error);

        app.bridge.integrations = serde_json::from_value(serde_json::json!([
            {"id": "postgres", "name": "PostgreSQL"}
        ]))
        .unwrap();
        let action = handle_normal_mode(&mut app, KeyCode::Enter, KeyModifiers::NONE).await;
        assert_eq!(action, Action::Api(ApiTask::CreateBridge));
    }

    #[tokio::test]
    async fn test_label_editing() {
        let mut app = app();
        handle_normal_mode(&mut app, KeyCode::Tab, KeyModifiers::NONE).await;
        assert_eq!(app.input_mode, InputMode::Editing);

        handle_editing_mode(&mut app, KeyCode::Char('x')).await;
        assert!(app.bridge.label.value().ends_with('x'));

        // q is text while editing
        handle_editing_mode(&mut app, KeyCode::Char('q')).await;
        assert!(!app.should_quit);

        handle_editing_mode(&mut app, KeyCode::Esc).await;
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_api_key_prompt_returns_validation() {
        let mut app = app();
        handle_normal_mode(&mut app, KeyCode::Char('K'), KeyModifiers::NONE).await;
        for c in "key".chars() {
            handle_editing_mode(&mut app, KeyCode::Char(c)).await;
        }
        let action = handle_editing_mode(&mut app, KeyCode::Enter).await;
        assert_eq!(action, Action::Api(ApiTask::ValidateConnection));
        assert!(app.has_client());
    }

    #[tokio::test]
    async fn test_start_without_loaded_sync_suggests_refresh() {
        let mut app = app_at(StepId::StartSync);
        let action = handle_normal_mode(&mut app, KeyCode::Enter, KeyModifiers::NONE).await;
        assert_eq!(action, Action::None);
        assert!(app.status_is_error);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Sync not loaded. Press r to refresh.")
        );

        app.start.sync = app.wizard.state().elt_sync.clone();
        let action = handle_normal_mode(&mut app, KeyCode::Enter, KeyModifiers::NONE).await;
        assert_eq!(action, Action::Api(ApiTask::EnableSync));
    }

    #[tokio::test]
    async fn test_auto_update_key_ignored_while_polling() {
        let mut app = app_at(StepId::MonitorSync);
        app.monitor.polling = true;
        handle_normal_mode(&mut app, KeyCode::Char('a'), KeyModifiers::NONE).await;
        assert!(app.status_message.is_none());

        app.monitor.polling = false;
        handle_normal_mode(&mut app, KeyCode::Char('a'), KeyModifiers::NONE).await;
        assert_eq!(app.status_message.as_deref(), Some("Auto update for 1 minute"));
    }
}
