use crate::core::errors::ExchangeError;
use crate::core::kernel::WsCodec;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

/// Engine.IO open packet contents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeInfo {
    #[serde(default)]
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

const fn default_ping_interval() -> u64 {
    25_000
}

const fn default_ping_timeout() -> u64 {
    20_000
}

impl HandshakeInfo {
    /// Longest silence tolerated before the connection is considered dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

impl Default for HandshakeInfo {
    fn default() -> Self {
        Self {
            sid: String::new(),
            ping_interval: default_ping_interval(),
            ping_timeout: default_ping_timeout(),
        }
    }
}

/// Inbound frame of the Socket.IO v5 / Engine.IO v4 protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketIoFrame {
    /// Engine.IO `0`
    Open(HandshakeInfo),
    /// Engine.IO `1`, or a WebSocket close frame
    Close,
    /// Engine.IO `2`; must be answered with a pong
    Ping,
    Pong,
    /// Socket.IO `40`: namespace connect acknowledged
    Connected,
    /// Socket.IO `41`
    Disconnected,
    /// Socket.IO `44`
    ConnectError(String),
    /// Socket.IO `42["name", payload]`
    Event { name: String, payload: Value },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SocketIoCodec;

impl SocketIoCodec {
    pub fn new() -> Self {
        Self
    }

    /// Namespace connect for the default namespace.
    pub fn encode_connect(&self) -> Message {
        Message::Text("40".to_string())
    }

    /// Reply to an Engine.IO ping.
    pub fn encode_pong(&self) -> Message {
        Message::Text("3".to_string())
    }
}

impl WsCodec for SocketIoCodec {
    type Message = SocketIoFrame;

    fn encode_event(&self, event: &str, payload: &Value) -> Result<Message, ExchangeError> {
        let packet = serde_json::to_string(&json!([event, payload]))?;
        Ok(Message::Text(format!("42{}", packet)))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8(data).map_err(|e| {
                ExchangeError::InvalidParameters(format!("Invalid UTF-8 in binary message: {}", e))
            })?,
            Message::Close(_) => return Ok(Some(SocketIoFrame::Close)),
            _ => return Ok(None),
        };

        decode_engine_packet(&text)
    }
}

fn split_kind(text: &str) -> Option<(char, &str)> {
    let kind = text.chars().next()?;
    Some((kind, &text[kind.len_utf8()..]))
}

fn decode_engine_packet(text: &str) -> Result<Option<SocketIoFrame>, ExchangeError> {
    let Some((kind, rest)) = split_kind(text) else {
        return Ok(None);
    };

    match kind {
        '0' => Ok(Some(SocketIoFrame::Open(serde_json::from_str(rest)?))),
        '1' => Ok(Some(SocketIoFrame::Close)),
        '2' => Ok(Some(SocketIoFrame::Ping)),
        '3' => Ok(Some(SocketIoFrame::Pong)),
        '4' => decode_socket_packet(rest),
        // upgrade / noop
        '5' | '6' => Ok(None),
        _ => Err(ExchangeError::InvalidParameters(format!(
            "Unknown Engine.IO packet type in {:?}",
            text
        ))),
    }
}

// Drops a leading "/namespace," if present.
fn strip_namespace(text: &str) -> &str {
    if text.starts_with('/') {
        text.find(',').map_or("", |idx| &text[idx + 1..])
    } else {
        text
    }
}

fn decode_socket_packet(text: &str) -> Result<Option<SocketIoFrame>, ExchangeError> {
    let Some((kind, rest)) = split_kind(text) else {
        return Ok(None);
    };
    let rest = strip_namespace(rest);

    match kind {
        '0' => Ok(Some(SocketIoFrame::Connected)),
        '1' => Ok(Some(SocketIoFrame::Disconnected)),
        '2' => {
            // optional numeric ack id before the argument array
            let body = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let args: Vec<Value> = serde_json::from_str(body)?;
            let mut args = args.into_iter();

            let name = match args.next() {
                Some(Value::String(name)) => name,
                _ => {
                    return Err(ExchangeError::InvalidParameters(
                        "Socket.IO event without a name".to_string(),
                    ))
                }
            };

            let mut rest: Vec<Value> = args.collect();
            let payload = match rest.len() {
                0 => Value::Null,
                1 => rest.pop().unwrap_or(Value::Null),
                _ => Value::Array(rest),
            };

            Ok(Some(SocketIoFrame::Event { name, payload }))
        }
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Some(SocketIoFrame::ConnectError(message)))
        }
        // acks and binary packets are not used by this stream
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Result<Option<SocketIoFrame>, ExchangeError> {
        SocketIoCodec.decode_message(Message::Text(text.to_string()))
    }

    #[test]
    fn test_decode_open() {
        let frame = decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#)
            .unwrap()
            .unwrap();

        if let SocketIoFrame::Open(info) = frame {
            assert_eq!(info.sid, "abc");
            assert_eq!(info.liveness_window(), Duration::from_secs(45));
        } else {
            panic!("Expected open frame");
        }
    }

    #[test]
    fn test_decode_control_packets() {
        assert_eq!(decode("2").unwrap(), Some(SocketIoFrame::Ping));
        assert_eq!(decode("3").unwrap(), Some(SocketIoFrame::Pong));
        assert_eq!(decode("1").unwrap(), Some(SocketIoFrame::Close));
        assert_eq!(decode("6").unwrap(), None);
        assert_eq!(decode("").unwrap(), None);
        assert_eq!(decode(r#"40{"sid":"xyz"}"#).unwrap(), Some(SocketIoFrame::Connected));
        assert_eq!(decode("41").unwrap(), Some(SocketIoFrame::Disconnected));
    }

    #[test]
    fn test_decode_event_keeps_payload_raw() {
        let frame = decode(r#"42["df-order-update",{"event":"df-order-update","data":"[{\"id\":\"1\"}]"}]"#)
            .unwrap()
            .unwrap();

        match frame {
            SocketIoFrame::Event { name, payload } => {
                assert_eq!(name, "df-order-update");
                // nested encoding stays a string
                assert_eq!(payload["data"], Value::String(r#"[{"id":"1"}]"#.to_string()));
            }
            other => panic!("Expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_event_with_namespace_and_ack_id() {
        let frame = decode(r#"42/futures,17["new-trade",{"p":"1"}]"#).unwrap().unwrap();
        assert_eq!(
            frame,
            SocketIoFrame::Event {
                name: "new-trade".to_string(),
                payload: json!({"p": "1"}),
            }
        );
    }

    #[test]
    fn test_decode_event_without_payload() {
        let frame = decode(r#"42["candlestick"]"#).unwrap().unwrap();
        assert_eq!(
            frame,
            SocketIoFrame::Event {
                name: "candlestick".to_string(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn test_decode_connect_error() {
        let frame = decode(r#"44{"message":"Not authorized"}"#).unwrap().unwrap();
        assert_eq!(frame, SocketIoFrame::ConnectError("Not authorized".to_string()));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("9hello").is_err());
        assert!(decode("42not-json").is_err());
        assert!(decode("42[1,2]").is_err());
    }

    #[test]
    fn test_websocket_close_maps_to_close() {
        let frame = SocketIoCodec.decode_message(Message::Close(None)).unwrap();
        assert_eq!(frame, Some(SocketIoFrame::Close));
    }

    #[test]
    fn test_encode_event() {
        let msg = SocketIoCodec
            .encode_event("join", &json!({"channelName": "B-BTC_USDT@trades-futures"}))
            .unwrap();

        if let Message::Text(text) = msg {
            assert_eq!(text, r#"42["join",{"channelName":"B-BTC_USDT@trades-futures"}]"#);
        } else {
            panic!("Expected text message");
        }
    }

    #[test]
    fn test_encode_control_frames() {
        assert_eq!(SocketIoCodec.encode_connect(), Message::Text("40".to_string()));
        assert_eq!(SocketIoCodec.encode_pong(), Message::Text("3".to_string()));
    }
}
