//! Engine.IO v4 / Socket.IO v5 text packet codec
//!
//! Every WebSocket text frame is one Engine.IO packet. The first character is
//! the Engine.IO type; type `4` (message) carries a Socket.IO packet whose own
//! type is the next character:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2 / 3                                                     ping / pong
//! 40                                                        connect (default namespace)
//! 40{"sid":".."}                                            connect ack
//! 42["receiveMessage",{...}]                                event
//! 4213["name",...]                                          event with ack id 13
//! 42/admin,["name",...]                                     event in namespace /admin
//! 44{"message":"not authorized"}                            connect error
//! ```

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Frame sent by the client to join the default namespace.
pub const CONNECT: &str = "40";
/// Reply to an Engine.IO ping.
pub const PONG: &str = "3";
/// Engine.IO close, sent before dropping the socket.
pub const CLOSE: &str = "1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type {0:?}")]
    UnknownEngineType(char),
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketType(char),
    #[error("malformed handshake: {0}")]
    Handshake(String),
    #[error("malformed event payload: {0}")]
    Event(String),
}

/// Session parameters from the Engine.IO open packet.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// One Socket.IO packet carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        payload: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: Option<u64>,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        payload: Option<Value>,
    },
}

/// Parse one text frame.
pub fn parse(frame: &str) -> Result<Packet, PacketError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| PacketError::Handshake(e.to_string())),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => parse_socket(rest).map(Packet::Message),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(PacketError::UnknownEngineType(other)),
    }
}

fn parse_socket(body: &str) -> Result<SocketPacket, PacketError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(PacketError::Empty)?;
    let (namespace, rest) = split_namespace(chars.as_str());

    match kind {
        '0' => Ok(SocketPacket::Connect {
            namespace,
            payload: parse_optional_json(rest),
        }),
        '1' => Ok(SocketPacket::Disconnect { namespace }),
        '2' => {
            let (ack_id, rest) = split_ack_id(rest);
            let mut args = parse_args(rest)?;
            if args.is_empty() {
                return Err(PacketError::Event("missing event name".to_string()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => return Err(PacketError::Event(format!("event name {} is not a string", other))),
            };
            Ok(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            })
        }
        '3' => {
            let (ack_id, rest) = split_ack_id(rest);
            Ok(SocketPacket::Ack {
                namespace,
                ack_id,
                args: parse_args(rest)?,
            })
        }
        '4' => Ok(SocketPacket::ConnectError {
            namespace,
            payload: parse_optional_json(rest),
        }),
        other => Err(PacketError::UnknownSocketType(other)),
    }
}

/// Split an optional `/namespace,` prefix. The default namespace is `/`.
fn split_namespace(body: &str) -> (String, &str) {
    if body.starts_with('/') {
        match body.find(',') {
            Some(pos) => (body[..pos].to_string(), &body[pos + 1..]),
            None => (body.to_string(), ""),
        }
    } else {
        ("/".to_string(), body)
    }
}

fn split_ack_id(body: &str) -> (Option<u64>, &str) {
    let digits = body.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return (None, body);
    }
    (body[..digits].parse().ok(), &body[digits..])
}

fn parse_optional_json(body: &str) -> Option<Value> {
    if body.is_empty() {
        None
    } else {
        serde_json::from_str(body).ok()
    }
}

fn parse_args(body: &str) -> Result<Vec<Value>, PacketError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(body) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(PacketError::Event(format!("expected array, got {}", other))),
        Err(e) => Err(PacketError::Event(e.to_string())),
    }
}

/// Encode an event in the default namespace: `42["name",payload]`.
pub fn encode_event(name: &str, payload: &Value) -> String {
    let body = Value::Array(vec![Value::String(name.to_string()), payload.clone()]);
    format!("42{}", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open() {
        let packet = parse(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        match packet {
            Packet::Open(hs) => {
                assert_eq!(hs.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(hs.ping_interval, 25000);
                assert_eq!(hs.ping_timeout, 20000);
                assert_eq!(hs.max_payload, Some(1_000_000));
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_open_rejects_garbage() {
        assert!(matches!(parse("0{nope"), Err(PacketError::Handshake(_))));
    }

    #[test]
    fn test_parse_control_packets() {
        assert_eq!(parse("1").unwrap(), Packet::Close);
        assert_eq!(parse("2").unwrap(), Packet::Ping);
        assert_eq!(parse("3").unwrap(), Packet::Pong);
        assert_eq!(parse("6").unwrap(), Packet::Noop);
        assert_eq!(parse(""), Err(PacketError::Empty));
        assert_eq!(parse("9"), Err(PacketError::UnknownEngineType('9')));
    }

    #[test]
    fn test_parse_connect_ack() {
        assert_eq!(
            parse(r#"40{"sid":"abc"}"#).unwrap(),
            Packet::Message(SocketPacket::Connect {
                namespace: "/".to_string(),
                payload: Some(json!({"sid": "abc"})),
            })
        );
    }

    #[test]
    fn test_parse_event_with_ack_and_namespace() {
        assert_eq!(
            parse(r#"42/admin,7["receiveMessage",{"content":"hi"}]"#).unwrap(),
            Packet::Message(SocketPacket::Event {
                namespace: "/admin".to_string(),
                ack_id: Some(7),
                name: "receiveMessage".to_string(),
                args: vec![json!({"content": "hi"})],
            })
        );
    }

    #[test]
    fn test_parse_event_without_name() {
        assert!(matches!(parse("42[]"), Err(PacketError::Event(_))));
        assert!(matches!(parse("42[1,2]"), Err(PacketError::Event(_))));
        assert!(matches!(parse(r#"42{"a":1}"#), Err(PacketError::Event(_))));
    }

    #[test]
    fn test_parse_connect_error_and_disconnect() {
        assert_eq!(
            parse(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::Message(SocketPacket::ConnectError {
                namespace: "/".to_string(),
                payload: Some(json!({"message": "Not authorized"})),
            })
        );
        assert_eq!(
            parse("41").unwrap(),
            Packet::Message(SocketPacket::Disconnect {
                namespace: "/".to_string()
            })
        );
    }

    #[test]
    fn test_encode_event() {
        let frame = encode_event("join", &json!("admin-1"));
        assert_eq!(frame, r#"42["join","admin-1"]"#);
        match parse(&frame).unwrap() {
            Packet::Message(SocketPacket::Event { name, args, .. }) => {
                assert_eq!(name, "join");
                assert_eq!(args, vec![json!("admin-1")]);
            }
            other => panic!("expected event, got {:?}", other),
        }
    }
}
