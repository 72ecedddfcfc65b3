//! UI rendering

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use weld_core::wizard::{ActiveStep, StepDescriptor, StepId};

use super::app::{App, ConnectionIndicator, InputMode};
use super::forms::{BridgeField, SyncField, TextInput};
use crate::output::{job_summary, truncate};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(outer_chunks[1]);

    draw_header(frame, app, outer_chunks[0]);
    draw_steps_pane(frame, app, pane_chunks[0]);
    draw_step_pane(frame, app, pane_chunks[1]);

    if app.api_key_input.is_some() {
        draw_api_key_input(frame, app, outer_chunks[2]);
    } else {
        draw_status_bar(frame, app, outer_chunks[2]);
    }

    // Draw help overlay if visible
    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Title on the left, API key indicator on the right
fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(18)])
        .split(area);

    let title = Paragraph::new(Span::styled(
        " Weld Connect · ELT sync setup",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(title, chunks[0]);

    let (text, style) = match app.connection {
        ConnectionIndicator::Connected => ("✓ connected ", Style::default().fg(Color::Green)),
        ConnectionIndicator::Validating => ("↻ validating ", Style::default().fg(Color::Yellow)),
        ConnectionIndicator::NotConnected => ("✗ not connected ", Style::default().fg(Color::Red)),
    };
    let indicator = Paragraph::new(Span::styled(text, style)).alignment(Alignment::Right);
    frame.render_widget(indicator, chunks[1]);
}

/// Step list with completion marks and summaries
fn draw_steps_pane(frame: &mut Frame, app: &App, area: Rect) {
    let wizard = &app.wizard;
    let state = wizard.state();

    let items: Vec<ListItem> = wizard
        .steps()
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let current = index == wizard.current_index();
            let (marker, style) = if wizard.is_completed(index) {
                ("✓", Style::default().fg(Color::Green))
            } else if current {
                ("▶", Style::default().add_modifier(Modifier::BOLD))
            } else {
                ("·", Style::default().add_modifier(Modifier::DIM))
            };

            let mut lines = vec![Line::from(vec![
                Span::styled(format!("{} ", marker), style),
                Span::styled(format!("{}. {}", index + 1, step.title), style),
            ])];
            if wizard.is_completed(index) {
                if let Some(summary) = step.summary(state) {
                    let max_len = area.width.saturating_sub(8) as usize;
                    lines.push(Line::from(Span::styled(
                        format!("     {}", truncate(&summary, max_len)),
                        Style::default().add_modifier(Modifier::DIM),
                    )));
                }
            }
            ListItem::new(lines)
        })
        .collect();

    let block = Block::default().title(" Steps ").borders(Borders::ALL);
    frame.render_widget(List::new(items).block(block), area);
}

/// The current step's form, or what it is missing
fn draw_step_pane(frame: &mut Frame, app: &App, area: Rect) {
    match app.wizard.active() {
        ActiveStep::Blocked { step, missing } => {
            let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
            let content = vec![
                Line::from(Span::styled(
                    "This step cannot continue.",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("Missing: {}", names.join(", "))),
                Line::from(""),
                Line::from(Span::styled(
                    "Press Ctrl-R to start over",
                    Style::default().add_modifier(Modifier::DIM),
                )),
            ];
            let paragraph = Paragraph::new(content)
                .block(step_block(step))
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
        }
        ActiveStep::Ready(step) => match step.id {
            StepId::CreateConnectionBridge => draw_bridge_step(frame, app, step, area),
            StepId::AuthorizeConnection => draw_authorize_step(frame, app, step, area),
            StepId::CreateEltSync => draw_create_sync_step(frame, app, step, area),
            StepId::AddSourceStreams => draw_streams_step(frame, app, step, area),
            StepId::StartSync => draw_start_step(frame, app, step, area),
            StepId::MonitorSync => draw_monitor_step(frame, app, step, area),
        },
    }
}

fn step_block(step: &StepDescriptor) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", step.title))
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD))
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

/// Bordered single-line text field; places the cursor while editing
fn draw_text_input(
    frame: &mut Frame,
    app: &App,
    input: &TextInput,
    title: &str,
    focused: bool,
    area: Rect,
) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(focus_style(focused));
    frame.render_widget(Paragraph::new(input.value()).block(block), area);

    if focused && app.input_mode == InputMode::Editing && app.api_key_input.is_none() {
        let cursor_x = area.x + 1 + input.cursor() as u16;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn draw_bridge_step(frame: &mut Frame, app: &App, step: &StepDescriptor, area: Rect) {
    let block = step_block(step);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(inner);

    let form = &app.bridge;
    let list_focused = form.focus == BridgeField::Integration;

    let items: Vec<ListItem> = form
        .integrations
        .iter()
        .map(|integration| {
            let mut spans = vec![Span::raw(integration.name.clone())];
            if let Some(ref plan) = integration.min_required_plan {
                spans.push(Span::styled(
                    format!("  (requires {})", plan),
                    Style::default().add_modifier(Modifier::DIM),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = if form.integrations.is_empty() {
        " Integration (none loaded, press c to retry) "
    } else {
        " Integration "
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(list_focused)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !form.integrations.is_empty() {
        state.select(Some(form.selected));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);

    draw_text_input(
        frame,
        app,
        &form.label,
        "Connection label",
        form.focus == BridgeField::Label,
        chunks[1],
    );
}

fn draw_authorize_step(frame: &mut Frame, app: &App, step: &StepDescriptor, area: Rect) {
    let block = step_block(step);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(inner);

    let authorize_url = app
        .wizard
        .state()
        .connection_bridge
        .as_ref()
        .map(|bridge| bridge.authorize_url.clone())
        .unwrap_or_default();

    let mut content = vec![
        Line::from("Grant access in the browser, then come back here."),
        Line::from(""),
        Line::from(Span::styled(authorize_url, Style::default().fg(Color::Cyan))),
        Line::from(""),
    ];
    match app.auth_server {
        Some(ref server) if app.authorize.listening => content.push(Line::from(vec![
            Span::styled("↻ ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("Waiting for the redirect on {}", server.redirect_uri())),
        ])),
        _ => content.push(Line::from(Span::styled(
            "Not listening for the redirect. Paste the connection id below.",
            Style::default().add_modifier(Modifier::DIM),
        ))),
    }
    if app.authorize.opened {
        content.push(Line::from(Span::styled(
            "Opened in browser",
            Style::default().add_modifier(Modifier::DIM),
        )));
    }

    let paragraph = Paragraph::new(content).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, chunks[0]);

    draw_text_input(
        frame,
        app,
        &app.authorize.connection_id,
        "Connection id (p to paste)",
        app.input_mode == InputMode::Editing,
        chunks[1],
    );
}

fn draw_create_sync_step(frame: &mut Frame, app: &App, step: &StepDescriptor, area: Rect) {
    let block = step_block(step);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);

    let form = &app.create_sync;

    // Settings summary
    let settings_focused = form.focus == SyncField::Settings;
    let mut settings = vec![Line::from(Span::raw(truncate(
        &form.form.settings_raw.split_whitespace().collect::<Vec<_>>().join(" "),
        chunks[0].width.saturating_sub(2) as usize,
    )))];
    if !form.loaded {
        settings.push(Line::from(Span::styled(
            "Loading settings schema...",
            Style::default().add_modifier(Modifier::DIM),
        )));
    } else if !form.summary.required.is_empty() {
        settings.push(Line::from(Span::styled(
            format!("Required: {}", form.summary.required.join(", ")),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    let settings_block = Block::default()
        .title(" ELT settings (e to edit) ")
        .borders(Borders::ALL)
        .border_style(focus_style(settings_focused));
    frame.render_widget(Paragraph::new(settings).block(settings_block), chunks[0]);

    // Interval
    let interval = Paragraph::new(Line::from(vec![
        Span::raw(form.form.interval_label()),
        Span::styled(
            format!("  ({})", form.form.interval_cron()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]))
    .block(
        Block::default()
            .title(" Sync interval (space to change) ")
            .borders(Borders::ALL)
            .border_style(focus_style(form.focus == SyncField::Interval)),
    );
    frame.render_widget(interval, chunks[1]);

    draw_text_input(
        frame,
        app,
        &form.start_date,
        "Start date (YYYY-MM-DD)",
        form.focus == SyncField::StartDate,
        chunks[2],
    );
    draw_text_input(
        frame,
        app,
        &form.schema,
        "Destination schema",
        form.focus == SyncField::Schema,
        chunks[3],
    );

    if form.loaded {
        if let Some(message) = form.validation_error() {
            let error = Paragraph::new(Span::styled(message, Style::default().fg(Color::Red)))
                .wrap(Wrap { trim: true });
            frame.render_widget(error, chunks[4]);
        }
    }
}

fn draw_streams_step(frame: &mut Frame, app: &App, step: &StepDescriptor, area: Rect) {
    let block = step_block(step);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let form = &app.streams;
    let items: Vec<ListItem> = form
        .available
        .iter()
        .map(|stream| {
            if !stream.is_selectable {
                ListItem::new(Span::styled(
                    format!("[-] {}  (not selectable)", stream.name),
                    Style::default().add_modifier(Modifier::DIM),
                ))
            } else if form.editor.is_selected(&stream.name) {
                ListItem::new(format!("[x] {}", stream.name))
            } else {
                ListItem::new(format!("[ ] {}", stream.name))
            }
        })
        .collect();

    let title = if form.loaded {
        format!(" Streams ({} selected) ", form.editor.selected().len())
    } else {
        " Streams (loading...) ".to_string()
    };
    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !form.available.is_empty() {
        state.select(Some(form.cursor));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let footer = match form.editor.error() {
        Some(error) => Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        None => Span::styled(
            "space: toggle  e: edit configuration JSON  Enter: add streams",
            Style::default().add_modifier(Modifier::DIM),
        ),
    };
    frame.render_widget(Paragraph::new(footer), chunks[1]);
}

fn draw_start_step(frame: &mut Frame, app: &App, step: &StepDescriptor, area: Rect) {
    let form = &app.start;
    let mut content = Vec::new();

    match form.sync {
        Some(ref sync) => {
            content.push(Line::from(format!("Sync:     {}", sync.id)));
            content.push(Line::from(format!("Status:   {}", sync.status)));
            content.push(Line::from(format!("Schema:   {}", sync.destination_schema_name)));
            content.push(Line::from(format!("Interval: {}", sync.sync_interval)));
            content.push(Line::from(format!("Streams:  {}", sync.streams.len())));
        }
        None => content.push(Line::from(Span::styled(
            "Loading sync...",
            Style::default().add_modifier(Modifier::DIM),
        ))),
    }
    content.push(Line::from(""));

    let enabled = |on: bool| {
        if on {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        }
    };
    let mut buttons = vec![Span::styled("[s] Start", enabled(form.can_start()))];
    if form.shows_stop() {
        buttons.push(Span::raw("   "));
        buttons.push(Span::styled("[x] Stop", enabled(form.can_stop())));
    }
    content.push(Line::from(buttons));

    let paragraph = Paragraph::new(content)
        .block(step_block(step))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_monitor_step(frame: &mut Frame, app: &App, step: &StepDescriptor, area: Rect) {
    let block = step_block(step);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let monitor = &app.monitor;
    let polling = if monitor.polling {
        Span::styled("↻ auto-updating", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            "○ paused (a: auto update for 1 minute)",
            Style::default().add_modifier(Modifier::DIM),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(polling)), chunks[0]);

    let rows: Vec<Row> = monitor
        .rows()
        .into_iter()
        .map(|row| {
            Row::new(vec![
                row.name.clone(),
                job_summary(row.active_sync.as_ref()),
                job_summary(row.latest_sync.as_ref()),
            ])
        })
        .collect();

    let empty = rows.is_empty();
    let header = Row::new(vec!["Stream", "Active", "Latest"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(35),
            Constraint::Percentage(35),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::TOP))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !empty {
        state.select(Some(monitor.selected));
    }
    frame.render_stateful_widget(table, chunks[1], &mut state);

    let footer = match monitor.last_error {
        Some(ref error) => Span::styled(
            format!("Status fetch failed: {}", error),
            Style::default().fg(Color::Red),
        ),
        None if empty => Span::styled(
            "No stream status yet",
            Style::default().add_modifier(Modifier::DIM),
        ),
        None => Span::styled(
            "r: run  f: full refresh  u: refresh now  p: pause",
            Style::default().add_modifier(Modifier::DIM),
        ),
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (content, style) = if let Some(busy) = app.busy {
        (busy.to_string(), Style::default().fg(Color::Yellow))
    } else if let Some(ref msg) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        (msg.clone(), style)
    } else {
        (
            key_hints(app).to_string(),
            Style::default().add_modifier(Modifier::DIM),
        )
    };

    frame.render_widget(Paragraph::new(content).style(style), area);
}

fn key_hints(app: &App) -> &'static str {
    if app.input_mode == InputMode::Editing {
        return "Enter: done  Esc: cancel  Tab: next field";
    }
    if app.is_blocked() {
        return "Ctrl-R: start over  ?: help  q: quit";
    }
    match app.current_step() {
        StepId::CreateConnectionBridge => "j/k: select  Tab: label  Enter: create bridge  ?: help  q: quit",
        StepId::AuthorizeConnection => "o: open browser  p: paste connection id  ?: help  q: quit",
        StepId::CreateEltSync => "Tab: next field  e: edit settings  space: interval  Enter: create sync  ?: help",
        StepId::AddSourceStreams => "j/k: move  space: toggle  e: edit JSON  Enter: add  ?: help",
        StepId::StartSync => "s: start  x: stop  r: refresh  ?: help  q: quit",
        StepId::MonitorSync => "j/k: move  r: run  f: full refresh  u: refresh  a: auto  p: pause  ?: help",
    }
}

/// API key prompt at the bottom; the key is masked
fn draw_api_key_input(frame: &mut Frame, app: &App, area: Rect) {
    let Some(ref input) = app.api_key_input else {
        return;
    };
    let prefix = "API key: ";
    let masked = "*".repeat(input.value().chars().count());

    let line = Line::from(vec![
        Span::styled(prefix, Style::default().fg(Color::Yellow)),
        Span::raw(masked),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    // Position cursor
    let cursor_x = area.x + prefix.len() as u16 + input.cursor() as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    // Calculate centered popup area
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 24.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Wizard:"),
        Line::from("  j/k, ↑/↓    Move selection"),
        Line::from("  Tab         Next field"),
        Line::from("  Enter       Submit the current step"),
        Line::from("  e           Edit JSON in $EDITOR"),
        Line::from("  Ctrl-R      Start over"),
        Line::from(""),
        Line::from("Monitor:"),
        Line::from("  r           Run selected stream"),
        Line::from("  f           Full refresh selected stream"),
        Line::from("  u           Refresh status now"),
        Line::from("  a / p       Auto update for 1 minute / pause"),
        Line::from(""),
        Line::from("  K           Enter API key"),
        Line::from("  c           Check API key"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}
