//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use super::app::{App, Pane};
use super::compose;
use super::messages;
use super::sidebar;
use crate::relay::ConnectionState;

/// Width of the roster sidebar in columns.
const SIDEBAR_WIDTH: u16 = 28;

/// Indicator symbol and color for the relay connection.
fn connection_indicator(state: &ConnectionState) -> (&'static str, Color) {
    match state {
        ConnectionState::Connected => ("*", Color::Green),
        ConnectionState::Connecting => ("~", Color::Yellow),
        ConnectionState::Backoff { .. } => ("~", Color::Yellow),
        ConnectionState::Disconnected => ("o", Color::Red),
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);

    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
            .areas(main_area);

    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        app.panel.roster(),
        app.panel.selected().map(|u| u.id.as_str()),
        &app.sidebar,
        app.active_pane == Pane::Sidebar,
    );

    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);

    messages::render(
        messages_area,
        frame.buffer_mut(),
        &app.panel,
        &app.messages,
        app.active_pane == Pane::Messages,
    );

    compose::render(
        compose_area,
        frame,
        &app.compose,
        app.panel.input_enabled(),
        app.active_pane == Pane::Compose,
    );

    render_status(status_area, frame.buffer_mut(), app);
}

/// Header bar: title on the left, operator on the right.
fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = " Admin Chat";
    let operator = format!(" {} ", app.panel.operator().display_name());

    let used = title.chars().count() + operator.chars().count();
    let padding = (area.width as usize).saturating_sub(used);

    let line = Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(padding)),
        Span::styled(operator, Style::default().fg(Color::Cyan)),
    ]);

    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Status bar: connection, open conversation, focused pane, newest log line.
fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    let (symbol, color) = connection_indicator(&app.connection);
    let sep_style = Style::default().fg(Color::Gray);

    let conversation = app
        .panel
        .selected()
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| "(none)".to_string());

    let mut spans = vec![
        Span::styled(
            format!(" {} {} ", symbol, app.connection),
            Style::default().fg(color),
        ),
        Span::styled(" | ", sep_style),
        Span::styled(conversation, Style::default().fg(Color::Yellow)),
        Span::styled(" | ", sep_style),
        Span::styled(
            format!("Tab: {} ", app.active_pane.as_str()),
            Style::default().fg(Color::Cyan),
        ),
    ];

    if let Some(ref tail) = app.log_tail {
        spans.push(Span::styled(" | ", sep_style));
        spans.push(Span::styled(tail.clone(), Style::default().fg(Color::Gray)));
    }

    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}
