//! Async backend: runs REST fetches off the UI loop.
//!
//! The UI sends `BackendCommand` values; each one is executed on its own
//! tokio task and the result comes back as a `BackendResponse`. Responses can
//! therefore arrive in any order, which is why history results carry the
//! ticket they were issued for.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::api::{self, client::ChatClient};
use crate::models::{ChatMessage, User};
use crate::panel::HistoryTicket;

/// Commands sent from the UI loop to the backend.
pub enum BackendCommand {
    LoadRoster,
    LoadHistory {
        ticket: HistoryTicket,
        operator_id: String,
    },
}

/// Results sent back to the UI loop.
pub enum BackendResponse {
    Roster(Result<Vec<User>>),
    History {
        ticket: HistoryTicket,
        result: Result<Vec<ChatMessage>>,
    },
}

/// Handle for talking to the backend from the UI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Spawn the backend loop around an authenticated client.
    pub fn start(client: Arc<ChatClient>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(client, cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed, command dropped");
        }
    }

    /// Next response. `None` once the backend loop has exited.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

async fn backend_loop(
    client: Arc<ChatClient>,
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        let client = Arc::clone(&client);
        let resp_tx = resp_tx.clone();

        tokio::spawn(async move {
            let response = match cmd {
                BackendCommand::LoadRoster => {
                    BackendResponse::Roster(api::fetch_roster(&client).await)
                }
                BackendCommand::LoadHistory {
                    ticket,
                    operator_id,
                } => {
                    let result =
                        api::fetch_history(&client, &operator_id, &ticket.counterpart_id).await;
                    BackendResponse::History { ticket, result }
                }
            };
            let _ = resp_tx.send(response);
        });
    }
}
