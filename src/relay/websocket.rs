//! Relay WebSocket connection and frame handling

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::packet;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub struct RelaySocket {
    stream: WsStream,
}

impl RelaySocket {
    /// Connect to the relay's Socket.IO endpoint.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        tracing::info!("Connecting WebSocket to {}", ws_url);

        let (stream, response) = connect_async(ws_url)
            .await
            .context("WebSocket connection failed")?;

        tracing::info!("WebSocket connected (status={})", response.status());

        Ok(Self { stream })
    }

    /// Send a text frame.
    pub async fn send_text(&mut self, msg: &str) -> Result<()> {
        tracing::debug!("WS send: {}", msg);
        self.stream
            .send(Message::Text(msg.to_string()))
            .await
            .context("Failed to send WebSocket message")
    }

    /// Emit a Socket.IO event in the default namespace.
    pub async fn emit(&mut self, event: &str, payload: &serde_json::Value) -> Result<()> {
        self.send_text(&packet::encode_event(event, payload)).await
    }

    /// Receive the next text frame, ignoring WebSocket pings/pongs.
    ///
    /// Engine.IO pings (`2`) are answered with a pong (`3`) here and still
    /// returned, so the caller can count them as liveness.
    pub async fn recv_frame(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!("WS recv: {}", text);

                    if text == "2" {
                        self.send_text(packet::PONG)
                            .await
                            .context("Failed to answer Engine.IO ping")?;
                    }

                    return Ok(Some(text));
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .context("Failed to send pong")?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("WebSocket closed: {:?}", frame);
                    return Ok(None);
                }
                Some(Ok(other)) => {
                    tracing::debug!("WS frame (ignored): {:?}", other);
                }
                Some(Err(e)) => {
                    return Err(e).context("WebSocket receive error");
                }
                None => {
                    return Ok(None);
                }
            }
        }
    }

    /// Say goodbye to the server and close the socket.
    pub async fn close(mut self) {
        if let Err(e) = self.send_text(packet::CLOSE).await {
            tracing::debug!("Engine.IO close not delivered: {:#}", e);
        }
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}
