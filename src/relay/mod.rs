//! Real-time message relay client (Socket.IO over WebSocket)
//!
//! One long-lived connection per operator identity. The operator joins a room
//! keyed by its id, messages for it arrive as `receiveMessage` events and
//! outbound messages are emitted as `sendMessage`. The server rebroadcasts sent
//! messages, so nothing is echoed locally.

pub mod packet;
pub mod session;
pub mod state;
pub mod websocket;

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::api::{self, client::ChatClient};
use crate::config::Config;
use crate::models::{ChatMessage, OutgoingMessage};
use packet::{Packet, SocketPacket};
pub use state::ConnectionState;
use state::Backoff;
use websocket::RelaySocket;

/// Event emitted to register the operator as a recipient.
pub const JOIN_EVENT: &str = "join";
/// Event emitted to send a message.
pub const SEND_EVENT: &str = "sendMessage";
/// Event received for every message addressed to or sent by the operator.
pub const RECEIVE_EVENT: &str = "receiveMessage";

/// Deadline used when the server's ping settings overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Events delivered to the owner of a [`RelayHandle`].
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    State(ConnectionState),
    Message(ChatMessage),
}

enum RelayCommand {
    Send(OutgoingMessage),
}

/// How one connected session ended.
enum SessionEnd {
    /// Owner went away. Do not reconnect.
    Shutdown,
    /// Connection lost after it was established.
    Dropped {
        error: anyhow::Error,
        connected_for: Duration,
    },
}

/// Handle to the background relay task.
///
/// Dropping the handle (or calling [`RelayHandle::shutdown`]) closes the
/// connection; it is not recreated until a new handle is spawned.
pub struct RelayHandle {
    cmd_tx: mpsc::UnboundedSender<RelayCommand>,
    event_rx: mpsc::UnboundedReceiver<RelayEvent>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Start the relay connection for `operator_id`.
    pub fn spawn(config: Config, operator_id: String) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(relay_loop(config, operator_id, cmd_rx, event_tx));

        Self {
            cmd_tx,
            event_rx,
            task,
        }
    }

    /// Queue a message for sending (non-blocking). Dropped if not connected.
    pub fn send(&self, msg: OutgoingMessage) {
        if self.cmd_tx.send(RelayCommand::Send(msg)).is_err() {
            tracing::error!("Relay task gone -- message dropped");
        }
    }

    /// Next state change or inbound message.
    ///
    /// Returns `None` once the relay task has stopped.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.event_rx.recv().await
    }

    /// Close the connection and wait for the task to finish.
    pub async fn shutdown(self) {
        let Self { cmd_tx, task, .. } = self;
        drop(cmd_tx);
        if let Err(e) = task.await {
            tracing::warn!("Relay task ended abnormally: {}", e);
        }
    }
}

fn notify(event_tx: &mpsc::UnboundedSender<RelayEvent>, event: RelayEvent) {
    if let RelayEvent::State(ref state) = event {
        tracing::debug!("Relay state: {}", state);
    }
    // Owner may already be gone during teardown.
    let _ = event_tx.send(event);
}

/// Connection loop with reconnect and exponential backoff.
async fn relay_loop(
    config: Config,
    operator_id: String,
    mut cmd_rx: mpsc::UnboundedReceiver<RelayCommand>,
    event_tx: mpsc::UnboundedSender<RelayEvent>,
) {
    let mut backoff = Backoff::new(config.relay.max_backoff_secs);

    loop {
        notify(&event_tx, RelayEvent::State(ConnectionState::Connecting));

        let error = match run_session(&config, &operator_id, &mut cmd_rx, &event_tx).await {
            Ok(SessionEnd::Shutdown) => {
                tracing::info!("Relay connection closed");
                notify(&event_tx, RelayEvent::State(ConnectionState::Disconnected));
                return;
            }
            Ok(SessionEnd::Dropped {
                error,
                connected_for,
            }) => {
                backoff.session_ended(connected_for);
                error
            }
            Err(e) => e,
        };

        if !config.relay.reconnect {
            tracing::warn!("Relay disconnected: {:#}", error);
            notify(&event_tx, RelayEvent::State(ConnectionState::Disconnected));
            return;
        }

        let (attempt, delay) = backoff.next_delay();
        tracing::warn!(
            "Relay disconnected: {:#}. Reconnecting in {}s...",
            error,
            delay.as_secs()
        );
        notify(
            &event_tx,
            RelayEvent::State(ConnectionState::Backoff { attempt, delay }),
        );

        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(RelayCommand::Send(msg)) => {
                        tracing::warn!("Relay not connected -- message to {} dropped", msg.to);
                    }
                    None => {
                        notify(&event_tx, RelayEvent::State(ConnectionState::Disconnected));
                        return;
                    }
                }
            }
        }
    }
}

/// Run one session: connect, handshake, join, then relay frames and commands.
///
/// Returns `Err` when the session could not be established at all.
async fn run_session(
    config: &Config,
    operator_id: &str,
    cmd_rx: &mut mpsc::UnboundedReceiver<RelayCommand>,
    event_tx: &mpsc::UnboundedSender<RelayEvent>,
) -> Result<SessionEnd> {
    let handshake_limit = Duration::from_secs(config.relay.handshake_timeout_secs);
    let opening = time::timeout(handshake_limit, session::open(config, operator_id));
    tokio::pin!(opening);

    // Sends during the handshake are dropped; a closed handle ends the attempt.
    let (mut ws, established) = loop {
        tokio::select! {
            opened = &mut opening => match opened {
                Ok(session) => break session?,
                Err(_) => anyhow::bail!(
                    "Relay handshake did not complete within {}s",
                    handshake_limit.as_secs()
                ),
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(RelayCommand::Send(msg)) => {
                    tracing::warn!("Relay still connecting -- message to {} dropped", msg.to);
                }
                None => return Ok(SessionEnd::Shutdown),
            },
        }
    };
    notify(event_tx, RelayEvent::State(ConnectionState::Connected));
    tracing::debug!(
        "Relay session up (engine sid={}, socket sid={})",
        established.handshake.sid,
        established.socket_sid.as_deref().unwrap_or("-")
    );

    let connected_at = Instant::now();
    let window = established.liveness_window();
    let mut deadline = deadline_after(window);

    let result: Result<()> = loop {
        tokio::select! {
            frame = ws.recv_frame() => {
                match frame {
                    Ok(Some(text)) => {
                        deadline = deadline_after(window);
                        if let Err(e) = handle_frame(&text, event_tx) {
                            break Err(e);
                        }
                    }
                    Ok(None) => break Err(anyhow::anyhow!("WebSocket closed by server")),
                    Err(e) => break Err(e.context("WebSocket recv error")),
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(RelayCommand::Send(msg)) => {
                        if let Err(e) = emit_message(&mut ws, &msg).await {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                }
            }
            _ = time::sleep_until(deadline) => {
                break Err(anyhow::anyhow!("No traffic for {}s (ping timeout)", window.as_secs()));
            }
        }
    };

    match result {
        Ok(()) => {
            ws.close().await;
            Ok(SessionEnd::Shutdown)
        }
        Err(error) => Ok(SessionEnd::Dropped {
            error,
            connected_for: connected_at.elapsed(),
        }),
    }
}

fn deadline_after(window: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(window).unwrap_or_else(|| now + FAR_FUTURE)
}

async fn emit_message(ws: &mut RelaySocket, msg: &OutgoingMessage) -> Result<()> {
    let payload = serde_json::to_value(msg).context("Failed to encode message")?;
    tracing::debug!("Sending message to {}", msg.to);
    ws.emit(SEND_EVENT, &payload).await
}

/// Handle one inbound frame. Returns `Err` when the server ended the session.
fn handle_frame(frame: &str, event_tx: &mpsc::UnboundedSender<RelayEvent>) -> Result<()> {
    let packet = match packet::parse(frame) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Ignoring malformed frame {:?}: {}", frame, e);
            return Ok(());
        }
    };

    match packet {
        Packet::Close => anyhow::bail!("Server closed the Engine.IO session"),
        Packet::Message(SocketPacket::Disconnect { namespace }) => {
            anyhow::bail!("Server disconnected namespace {}", namespace)
        }
        Packet::Message(SocketPacket::Event { name, args, .. }) if name == RECEIVE_EVENT => {
            let Some(payload) = args.into_iter().next() else {
                tracing::warn!("{} event without payload", RECEIVE_EVENT);
                return Ok(());
            };
            match serde_json::from_value::<ChatMessage>(payload) {
                Ok(msg) => notify(event_tx, RelayEvent::Message(msg)),
                Err(e) => tracing::warn!("Dropping undecodable {} payload: {}", RECEIVE_EVENT, e),
            }
            Ok(())
        }
        Packet::Message(SocketPacket::Event { name, .. }) => {
            tracing::debug!("Ignoring event {}", name);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Send a single message and disconnect. Returns false when content is blank.
pub async fn send_once(config: &Config, from: &str, to: &str, content: &str) -> Result<bool> {
    let Some(msg) = OutgoingMessage::compose(from, to, content) else {
        return Ok(false);
    };

    let (mut ws, _) = session::open(config, from).await?;
    emit_message(&mut ws, &msg).await?;
    ws.close().await;
    Ok(true)
}

/// Send a message to a counterpart (CLI).
pub async fn send_message(to: &str, message: &str) -> Result<()> {
    let config = Config::load()?;
    let client = ChatClient::new(&config)?;
    let operator = api::fetch_operator(&client).await?;

    if send_once(&config, &operator.id, to, message).await? {
        println!("Message sent.");
    } else {
        println!("Nothing to send.");
    }
    Ok(())
}

/// Print relay state changes and inbound messages until Ctrl-C (CLI).
pub async fn listen(with: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let client = ChatClient::new(&config)?;
    let operator = api::fetch_operator(&client).await?;

    let mut relay = RelayHandle::spawn(config, operator.id.clone());
    println!(
        "Listening as {} ({}). Ctrl-C to stop.",
        operator.display_name(),
        operator.id
    );

    loop {
        tokio::select! {
            event = relay.recv() => {
                match event {
                    Some(RelayEvent::State(state)) => println!("-- {}", state),
                    Some(RelayEvent::Message(msg)) => {
                        if with.as_deref().map_or(true, |id| msg.involves(id)) {
                            println!(
                                "[{}] {} -> {}: {}",
                                api::format_timestamp(&msg),
                                msg.from,
                                msg.to,
                                msg.content
                            );
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down...");
                break;
            }
        }
    }

    relay.shutdown().await;
    Ok(())
}
