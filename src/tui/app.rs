//! TUI application state and main event loop

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::compose::ComposeState;
use super::log_capture::LogBuffer;
use super::messages::MessagesState;
use super::sidebar::SidebarState;
use super::ui;
use crate::api::{self, client::ChatClient};
use crate::config::Config;
use crate::models::OutgoingMessage;
use crate::panel::{ChatPanel, HistoryTicket};
use crate::relay::{ConnectionState, RelayEvent, RelayHandle};

/// Redraw interval while idle, so the log tail stays fresh.
const TICK: Duration = Duration::from_millis(250);

/// Lines moved per PageUp / PageDown in the conversation.
const PAGE_LINES: usize = 10;

/// Focused pane
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "conversations",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }
}

/// Side effect requested by a key press, executed by the event loop.
#[derive(Debug, PartialEq)]
pub enum Action {
    LoadHistory(HistoryTicket),
    Send(OutgoingMessage),
}

/// Application state
pub struct App {
    pub should_exit: bool,
    pub panel: ChatPanel,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub active_pane: Pane,
    pub connection: ConnectionState,
    /// Newest captured log line, shown in the status bar.
    pub log_tail: Option<String>,
}

impl App {
    pub fn new(panel: ChatPanel) -> Self {
        Self {
            should_exit: false,
            panel,
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            active_pane: Pane::default(),
            connection: ConnectionState::Disconnected,
            log_tail: None,
        }
    }

    /// Handle one key press.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.should_exit = true;
                return None;
            }
            KeyCode::Esc => {
                self.should_exit = true;
                return None;
            }
            KeyCode::Tab => {
                self.cycle_focus(true);
                return None;
            }
            KeyCode::BackTab => {
                self.cycle_focus(false);
                return None;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => {
                self.handle_messages_key(key);
                None
            }
            Pane::Compose => self.handle_compose_key(key, ctrl),
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = if self.panel.input_enabled() {
            &[Pane::Sidebar, Pane::Messages, Pane::Compose][..]
        } else {
            &[Pane::Sidebar, Pane::Messages][..]
        };
        let pos = order
            .iter()
            .position(|p| *p == self.active_pane)
            .unwrap_or(0);
        let next = if forward {
            (pos + 1) % order.len()
        } else {
            (pos + order.len() - 1) % order.len()
        };
        self.active_pane = order[next];
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(self.panel.roster().len()),
            KeyCode::Enter => {
                let counterpart = self.panel.roster().get(self.sidebar.selected)?.clone();
                let ticket = self.panel.select(counterpart);
                self.messages.follow();
                self.active_pane = Pane::Compose;
                return Some(Action::LoadHistory(ticket));
            }
            _ => {}
        }
        None
    }

    fn handle_messages_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Up | KeyCode::Char('k') => self.messages.scroll_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.messages.scroll_down(1),
            KeyCode::PageUp => self.messages.scroll_up(PAGE_LINES),
            KeyCode::PageDown => self.messages.scroll_down(PAGE_LINES),
            KeyCode::End => self.messages.follow(),
            _ => {}
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent, ctrl: bool) -> Option<Action> {
        if !self.panel.input_enabled() {
            return None;
        }

        match key.code {
            KeyCode::Char('u') if ctrl => self.compose.clear(),
            KeyCode::Char(c) if !ctrl => self.compose.insert_char(c),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Delete => self.compose.delete(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            KeyCode::Enter => return self.submit(),
            _ => {}
        }
        None
    }

    /// Turn the draft into an outbound message.
    ///
    /// The draft is kept when the relay is not connected so it can be retried.
    fn submit(&mut self) -> Option<Action> {
        let msg = self.panel.compose(&self.compose.input)?;
        if !self.connection.is_connected() {
            tracing::warn!("Relay is {}, message not sent", self.connection);
            return None;
        }
        self.compose.clear();
        self.messages.follow();
        Some(Action::Send(msg))
    }

    /// Apply a REST result.
    pub fn apply_backend(&mut self, response: BackendResponse) {
        match response {
            BackendResponse::Roster(result) => {
                self.panel.apply_roster(result);
                self.sidebar.loading = false;
                self.sidebar.clamp(self.panel.roster().len());
                tracing::info!("Roster loaded: {} conversations", self.panel.roster().len());
            }
            BackendResponse::History { ticket, result } => {
                if self.panel.apply_history(&ticket, result) {
                    self.messages.follow();
                }
            }
        }
    }

    /// Apply a relay state change or inbound message.
    pub fn apply_relay(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::State(state) => {
                if state != self.connection {
                    tracing::info!("Relay {}", state);
                }
                self.connection = state;
            }
            RelayEvent::Message(msg) => {
                self.panel.receive(msg);
            }
        }
    }
}

/// Run the terminal panel. Log output is captured into `log` while the
/// alternate screen is active.
pub async fn run(log: LogBuffer) -> Result<()> {
    let config = Config::load()?;
    let client = Arc::new(ChatClient::new(&config)?);
    let operator = api::fetch_operator(&client)
        .await
        .context("Could not resolve the operator identity. Run `admin-chat login --token <TOKEN>` first.")?;
    tracing::info!("Signed in as {} ({})", operator.display_name(), operator.id);

    let mut backend = Backend::start(client);
    let mut relay = RelayHandle::spawn(config, operator.id.clone());
    backend.send(BackendCommand::LoadRoster);

    let mut app = App::new(ChatPanel::new(operator));

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, &mut app, &mut backend, &mut relay, &log).await;
    ratatui::restore();

    relay.shutdown().await;
    result
}

async fn run_app(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    backend: &mut Backend,
    relay: &mut RelayHandle,
    log: &LogBuffer,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);
    let mut backend_open = true;
    let mut relay_open = true;

    while !app.should_exit {
        app.log_tail = log.latest();
        terminal.draw(|frame| ui::render(frame, app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app.handle_key(key) {
                        Some(Action::LoadHistory(ticket)) => backend.send(BackendCommand::LoadHistory {
                            ticket,
                            operator_id: app.panel.operator().id.clone(),
                        }),
                        Some(Action::Send(msg)) => relay.send(msg),
                        None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Terminal input error"),
                None => break,
            },
            response = backend.recv(), if backend_open => match response {
                Some(response) => app.apply_backend(response),
                None => backend_open = false,
            },
            event = relay.recv(), if relay_open => match event {
                Some(event) => app.apply_relay(event),
                None => {
                    relay_open = false;
                    app.connection = ConnectionState::Disconnected;
                }
            },
            _ = tick.tick() => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, User};

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: String::new(),
            avatar: None,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_roster() -> App {
        let mut app = App::new(ChatPanel::new(user("admin-1", "Mai")));
        app.apply_backend(BackendResponse::Roster(Ok(vec![
            user("u1", "An"),
            user("u2", "Binh"),
        ])));
        app
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_enter_on_roster_selects_and_requests_history() {
        let mut app = app_with_roster();
        assert!(!app.sidebar.loading);

        app.handle_key(key(KeyCode::Down));
        let action = app.handle_key(key(KeyCode::Enter));

        match action {
            Some(Action::LoadHistory(ticket)) => assert_eq!(ticket.counterpart_id, "u2"),
            other => panic!("expected history load, got {:?}", other),
        }
        assert_eq!(app.panel.selected().unwrap().id, "u2");
        assert_eq!(app.active_pane, Pane::Compose);
    }

    #[test]
    fn test_enter_on_empty_roster_does_nothing() {
        let mut app = App::new(ChatPanel::new(user("admin-1", "Mai")));
        app.apply_backend(BackendResponse::Roster(Err(anyhow::anyhow!("offline"))));
        assert!(app.handle_key(key(KeyCode::Enter)).is_none());
        assert!(app.panel.selected().is_none());
    }

    #[test]
    fn test_send_from_compose() {
        let mut app = app_with_roster();
        app.handle_key(key(KeyCode::Enter));
        app.apply_relay(RelayEvent::State(ConnectionState::Connected));

        type_text(&mut app, "quick question");
        assert_eq!(app.compose.input, "quick question");
        assert!(!app.should_exit);

        let action = app.handle_key(key(KeyCode::Enter));
        assert_eq!(
            action,
            Some(Action::Send(OutgoingMessage {
                from: "admin-1".to_string(),
                to: "u1".to_string(),
                content: "quick question".to_string(),
            }))
        );
        assert!(app.compose.input.is_empty());
        assert!(app.panel.messages().is_empty());
    }

    #[test]
    fn test_blank_or_offline_send_is_ignored() {
        let mut app = app_with_roster();
        app.handle_key(key(KeyCode::Enter));

        type_text(&mut app, "   ");
        assert!(app.handle_key(key(KeyCode::Enter)).is_none());

        app.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(app.compose.input.is_empty());

        type_text(&mut app, "hello");
        assert!(app.handle_key(key(KeyCode::Enter)).is_none());
        assert_eq!(app.compose.input, "hello");
    }

    #[test]
    fn test_compose_disabled_without_conversation() {
        let mut app = app_with_roster();
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_pane, Pane::Sidebar);

        app.active_pane = Pane::Compose;
        type_text(&mut app, "hi");
        assert!(app.compose.input.is_empty());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app_with_roster();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_exit);

        let mut app = app_with_roster();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_exit);

        let mut app = app_with_roster();
        app.handle_key(key(KeyCode::Esc));
        assert!(app.should_exit);
    }

    #[test]
    fn test_stale_history_response_ignored() {
        let mut app = app_with_roster();
        let first = match app.handle_key(key(KeyCode::Enter)) {
            Some(Action::LoadHistory(t)) => t,
            _ => panic!("expected history load"),
        };
        app.active_pane = Pane::Sidebar;
        app.handle_key(key(KeyCode::Down));
        let second = match app.handle_key(key(KeyCode::Enter)) {
            Some(Action::LoadHistory(t)) => t,
            _ => panic!("expected history load"),
        };

        let msg = |id: &str, from: &str| ChatMessage {
            id: id.to_string(),
            from: from.to_string(),
            to: "admin-1".to_string(),
            content: String::new(),
            created_at: None,
        };

        app.apply_backend(BackendResponse::History {
            ticket: second,
            result: Ok(vec![msg("b", "u2")]),
        });
        app.apply_backend(BackendResponse::History {
            ticket: first,
            result: Ok(vec![msg("a", "u1")]),
        });
        assert_eq!(app.panel.messages().len(), 1);
        assert_eq!(app.panel.messages()[0].id, "b");
    }

    #[test]
    fn test_relay_message_for_other_counterpart_dropped() {
        let mut app = app_with_roster();
        let ticket = match app.handle_key(key(KeyCode::Enter)) {
            Some(Action::LoadHistory(t)) => t,
            _ => panic!("expected history load"),
        };
        app.apply_backend(BackendResponse::History {
            ticket,
            result: Ok(Vec::new()),
        });

        app.apply_relay(RelayEvent::Message(ChatMessage {
            id: "x".to_string(),
            from: "u2".to_string(),
            to: "admin-1".to_string(),
            content: "psst".to_string(),
            created_at: None,
        }));
        assert!(app.panel.messages().is_empty());

        app.apply_relay(RelayEvent::Message(ChatMessage {
            id: "y".to_string(),
            from: "u1".to_string(),
            to: "admin-1".to_string(),
            content: "hello".to_string(),
            created_at: None,
        }));
        assert_eq!(app.panel.messages().len(), 1);
    }
}
