//! Admin chat panel: roster, selected conversation and message filtering
//!
//! Pure state with no I/O. Fetches are issued by the caller; their results are
//! fed back through `apply_roster` / `apply_history`, and relay traffic through
//! `receive`. The operator identity is supplied at construction and never
//! changes for the lifetime of a panel.

use anyhow::Result;

use crate::models::{ChatMessage, OutgoingMessage, User};

/// Whether a conversation is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    /// Nothing selected; the compose input is disabled.
    NoConversation,
    /// A counterpart is selected; the compose input is enabled.
    Conversation,
}

/// Identifies one history request so that only the latest one is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    pub generation: u64,
    pub counterpart_id: String,
}

/// State of the two-pane chat panel.
pub struct ChatPanel {
    operator: User,
    roster: Vec<User>,
    selected: Option<User>,
    messages: Vec<ChatMessage>,
    generation: u64,
    /// Live messages for the selected counterpart that arrived before its
    /// history. `None` once the history has been applied.
    held: Option<Vec<ChatMessage>>,
}

impl ChatPanel {
    pub fn new(operator: User) -> Self {
        Self {
            operator,
            roster: Vec::new(),
            selected: None,
            messages: Vec::new(),
            generation: 0,
            held: None,
        }
    }

    pub fn operator(&self) -> &User {
        &self.operator
    }

    pub fn roster(&self) -> &[User] {
        &self.roster
    }

    pub fn selected(&self) -> Option<&User> {
        self.selected.as_ref()
    }

    /// Messages of the selected conversation, in arrival order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn mode(&self) -> PanelMode {
        if self.selected.is_some() {
            PanelMode::Conversation
        } else {
            PanelMode::NoConversation
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.mode() == PanelMode::Conversation
    }

    /// Install the roster fetch result. A failed fetch leaves an empty roster.
    pub fn apply_roster(&mut self, result: Result<Vec<User>>) {
        self.roster = match result {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!("Roster fetch failed, showing empty roster: {:#}", e);
                Vec::new()
            }
        };
    }

    /// Select a counterpart. Returns the ticket for the history fetch to issue.
    ///
    /// The visible messages stay as they are until the history arrives. Live
    /// messages for the new counterpart are held back until then so the
    /// previous conversation is never mixed with the new one.
    pub fn select(&mut self, counterpart: User) -> HistoryTicket {
        self.generation += 1;
        let ticket = HistoryTicket {
            generation: self.generation,
            counterpart_id: counterpart.id.clone(),
        };
        tracing::debug!(
            "Selected {} (history generation {})",
            counterpart.id,
            ticket.generation
        );
        self.selected = Some(counterpart);
        self.held = Some(Vec::new());
        ticket
    }

    /// Whether a ticket still belongs to the latest selection.
    pub fn is_current(&self, ticket: &HistoryTicket) -> bool {
        ticket.generation == self.generation
            && self
                .selected
                .as_ref()
                .is_some_and(|s| s.id == ticket.counterpart_id)
    }

    /// Replace the visible messages with a history fetch result.
    ///
    /// Results for superseded tickets are discarded and `false` is returned.
    /// A failed fetch for the current ticket leaves an empty conversation.
    pub fn apply_history(&mut self, ticket: &HistoryTicket, result: Result<Vec<ChatMessage>>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Discarding stale history for {} (generation {} < {})",
                ticket.counterpart_id,
                ticket.generation,
                self.generation
            );
            return false;
        }

        let held = self.held.take().unwrap_or_default();
        self.messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(
                    "History fetch for {} failed, showing empty conversation: {:#}",
                    ticket.counterpart_id,
                    e
                );
                Vec::new()
            }
        };

        // The history may already contain what arrived live meanwhile.
        for msg in held {
            let known = !msg.id.is_empty() && self.messages.iter().any(|m| m.id == msg.id);
            if !known {
                self.messages.push(msg);
            }
        }
        true
    }

    /// Handle an inbound relay message.
    ///
    /// Kept only when it is to or from the selected counterpart; anything
    /// else is dropped without being queued or counted. While that
    /// counterpart's history is outstanding the message is held and shown
    /// after the history.
    pub fn receive(&mut self, msg: ChatMessage) -> bool {
        match self.selected {
            Some(ref counterpart) if msg.involves(&counterpart.id) => {
                match self.held {
                    Some(ref mut held) => held.push(msg),
                    None => self.messages.push(msg),
                }
                true
            }
            _ => {
                tracing::debug!("Dropping message {} -> {} (not in view)", msg.from, msg.to);
                false
            }
        }
    }

    /// Build the outbound message for `content`.
    ///
    /// Returns `None` when the content is blank or nothing is selected. The
    /// message is not appended locally; the server's rebroadcast delivers it.
    pub fn compose(&self, content: &str) -> Option<OutgoingMessage> {
        let counterpart = self.selected.as_ref()?;
        OutgoingMessage::compose(&self.operator.id, &counterpart.id, content)
    }
}
