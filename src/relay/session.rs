//! Relay session setup: endpoint URL, Engine.IO open, Socket.IO connect, room join

use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use super::packet::{self, Handshake, Packet, SocketPacket};
use super::websocket::RelaySocket;
use super::JOIN_EVENT;
use crate::config::Config;

/// Engine.IO protocol revision spoken by this client.
const ENGINE_IO_VERSION: &str = "4";

/// Build the WebSocket URL for the relay endpoint.
///
/// `http(s)://host` becomes `ws(s)://host{path}?EIO=4&transport=websocket`.
pub fn ws_url(config: &Config) -> Result<String> {
    let mut url = Url::parse(&config.socket_url)
        .with_context(|| format!("Invalid socket_url {:?}", config.socket_url))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => bail!("Unsupported socket_url scheme {:?}", other),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("Cannot use scheme {} for {}", scheme, config.socket_url))?;

    let path = if config.relay.path.starts_with('/') {
        config.relay.path.clone()
    } else {
        format!("/{}", config.relay.path)
    };
    url.set_path(&path);
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", config.relay.transport.as_str());

    Ok(url.to_string())
}

/// Parameters of an established session.
#[derive(Debug, Clone)]
pub struct Established {
    pub handshake: Handshake,
    /// Socket.IO session id from the connect ack (may be absent on old servers).
    pub socket_sid: Option<String>,
}

impl Established {
    /// How long the connection may stay silent before it is considered dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(
            self.handshake
                .ping_interval
                .saturating_add(self.handshake.ping_timeout),
        )
    }
}

/// Run the Engine.IO open and Socket.IO connect exchange on a fresh socket.
pub async fn establish(ws: &mut RelaySocket) -> Result<Established> {
    // 1. Engine.IO open packet carries the session parameters.
    let frame = ws
        .recv_frame()
        .await?
        .context("Connection closed before Engine.IO open")?;
    let handshake = match packet::parse(&frame)? {
        Packet::Open(hs) => hs,
        other => bail!("Expected Engine.IO open packet, got {:?}", other),
    };
    tracing::info!(
        "Engine.IO session opened (sid={}, ping={}ms+{}ms)",
        handshake.sid,
        handshake.ping_interval,
        handshake.ping_timeout
    );

    // 2. Join the default Socket.IO namespace.
    ws.send_text(packet::CONNECT).await?;

    // 3. Wait for the connect ack, skipping pings that may arrive first.
    loop {
        let frame = ws
            .recv_frame()
            .await?
            .context("Connection closed before Socket.IO connect ack")?;
        match packet::parse(&frame)? {
            Packet::Message(SocketPacket::Connect { payload, .. }) => {
                let socket_sid = payload
                    .as_ref()
                    .and_then(|p| p.get("sid"))
                    .and_then(|s| s.as_str())
                    .map(String::from);
                tracing::info!("Socket.IO namespace connected");
                return Ok(Established {
                    handshake,
                    socket_sid,
                });
            }
            Packet::Message(SocketPacket::ConnectError { payload, .. }) => {
                let reason = payload
                    .as_ref()
                    .and_then(|p| p.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("no reason given")
                    .to_string();
                bail!("Relay refused connection: {}", reason);
            }
            Packet::Ping | Packet::Pong | Packet::Noop => continue,
            other => tracing::debug!("Ignoring packet before connect ack: {:?}", other),
        }
    }
}

/// Register the operator as a message recipient (room keyed by operator id).
pub async fn join(ws: &mut RelaySocket, operator_id: &str) -> Result<()> {
    tracing::info!("Joining relay room {}", operator_id);
    ws.emit(JOIN_EVENT, &serde_json::Value::String(operator_id.to_string()))
        .await
        .context("Failed to join relay room")
}

/// Connect, handshake and join in one step.
pub async fn open(config: &Config, operator_id: &str) -> Result<(RelaySocket, Established)> {
    let url = ws_url(config)?;
    let mut ws = RelaySocket::connect(&url).await?;
    let established = establish(&mut ws).await?;
    join(&mut ws, operator_id).await?;
    Ok((ws, established))
}
