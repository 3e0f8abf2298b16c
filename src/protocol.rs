// src/protocol.rs
//
// Text framing for Engine.IO v4 and Socket.IO v5 over a WebSocket transport.

use crate::constants::{DEFAULT_NAMESPACE, ENGINE_IO_VERSION, SOCKET_IO_PATH};
use crate::errors::{ChatlineError, ChatlineResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Handshake payload carried by the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn encode(&self) -> ChatlineResult<String> {
        Ok(match self {
            EnginePacket::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        })
    }

    pub fn decode(frame: &str) -> ChatlineResult<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChatlineError::protocol_error("empty engine.io frame"))?;
        let body = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(body.to_string())),
            '3' => Ok(EnginePacket::Pong(body.to_string())),
            '4' => Ok(EnginePacket::Message(body.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ChatlineError::protocol_error(format!(
                "unknown engine.io packet type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        id: Option<u64>,
        data: Vec<Value>,
    },
    Ack {
        namespace: String,
        id: u64,
        data: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Value,
    },
}

impl SocketPacket {
    pub fn connect(namespace: &str) -> Self {
        SocketPacket::Connect {
            namespace: namespace.to_string(),
            data: None,
        }
    }

    pub fn disconnect(namespace: &str) -> Self {
        SocketPacket::Disconnect {
            namespace: namespace.to_string(),
        }
    }

    /// Event packet with `name` as its first argument.
    pub fn event(namespace: &str, name: &str, args: Vec<Value>) -> Self {
        let mut data = Vec::with_capacity(args.len() + 1);
        data.push(Value::String(name.to_string()));
        data.extend(args);
        SocketPacket::Event {
            namespace: namespace.to_string(),
            id: None,
            data,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Event name and arguments, for `Event` packets only.
    pub fn event_parts(&self) -> Option<(&str, &[Value])> {
        match self {
            SocketPacket::Event { data, .. } => {
                let (name, args) = data.split_first()?;
                Some((name.as_str()?, args))
            }
            _ => None,
        }
    }

    pub fn encode(&self) -> ChatlineResult<String> {
        let (kind, id, payload) = match self {
            SocketPacket::Connect { data, .. } => ('0', None, data.clone()),
            SocketPacket::Disconnect { .. } => ('1', None, None),
            SocketPacket::Event { id, data, .. } => ('2', *id, Some(Value::Array(data.clone()))),
            SocketPacket::Ack { id, data, .. } => ('3', Some(*id), Some(Value::Array(data.clone()))),
            SocketPacket::ConnectError { data, .. } => ('4', None, Some(data.clone())),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = id {
            out.push_str(&id.to_string());
        }
        if let Some(payload) = payload {
            out.push_str(&serde_json::to_string(&payload)?);
        }
        Ok(out)
    }

    /// Encodes the packet wrapped in an Engine.IO message frame.
    pub fn to_frame(&self) -> ChatlineResult<String> {
        EnginePacket::Message(self.encode()?).encode()
    }

    pub fn decode(body: &str) -> ChatlineResult<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChatlineError::protocol_error("empty socket.io packet"))?;
        let mut rest = chars.as_str();

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            match rest.find(',') {
                Some(comma) => {
                    namespace = rest[..comma].to_string();
                    rest = &rest[comma + 1..];
                }
                None => {
                    namespace = rest.to_string();
                    rest = "";
                }
            }
        }

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let id = if digits > 0 {
            let parsed = rest[..digits]
                .parse::<u64>()
                .map_err(|e| ChatlineError::protocol_error(format!("bad ack id: {}", e)))?;
            rest = &rest[digits..];
            Some(parsed)
        } else {
            None
        };

        let payload: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        match kind {
            '0' => Ok(SocketPacket::Connect {
                namespace,
                data: payload,
            }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => Ok(SocketPacket::Event {
                namespace,
                id,
                data: expect_array(payload, "event")?,
            }),
            '3' => Ok(SocketPacket::Ack {
                namespace,
                id: id.ok_or_else(|| ChatlineError::protocol_error("ack without id"))?,
                data: expect_array(payload, "ack")?,
            }),
            '4' => Ok(SocketPacket::ConnectError {
                namespace,
                data: payload.unwrap_or(Value::Null),
            }),
            '5' | '6' => Err(ChatlineError::protocol_error(
                "binary socket.io packets are not supported",
            )),
            other => Err(ChatlineError::protocol_error(format!(
                "unknown socket.io packet type '{}'",
                other
            ))),
        }
    }
}

fn expect_array(payload: Option<Value>, what: &str) -> ChatlineResult<Vec<Value>> {
    match payload {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ChatlineError::protocol_error(format!(
            "{} payload must be an array, got {}",
            what, other
        ))),
        None => Err(ChatlineError::protocol_error(format!("{} without payload", what))),
    }
}

/// Builds the WebSocket endpoint for a Socket.IO server at `base`.
///
/// `http`/`https` map to `ws`/`wss`. A bare host gets the default
/// `/socket.io/` path; an explicit path is kept as is.
pub fn socket_endpoint(base: &str) -> ChatlineResult<Url> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChatlineError::config_error(format!(
                "unsupported server URL scheme '{}'",
                other
            )))
        }
    };
    if url.host_str().is_none() {
        return Err(ChatlineError::config_error("server URL has no host"));
    }
    url.set_scheme(scheme)
        .map_err(|_| ChatlineError::config_error("cannot convert server URL to a websocket URL"))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(SOCKET_IO_PATH);
    }
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_open_handshake() {
        let frame = r#"0{"sid":"abc123","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        match EnginePacket::decode(frame).unwrap() {
            EnginePacket::Open(h) => {
                assert_eq!(h.sid, "abc123");
                assert_eq!(h.ping_interval, 25000);
                assert_eq!(h.ping_timeout, 20000);
                assert_eq!(h.max_payload, Some(1_000_000));
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_control_packets() {
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::decode("3probe").unwrap(), EnginePacket::Pong("probe".into()));
        assert_eq!(EnginePacket::decode("1").unwrap(), EnginePacket::Close);
        assert_eq!(EnginePacket::decode("6").unwrap(), EnginePacket::Noop);
        assert_eq!(EnginePacket::Pong(String::new()).encode().unwrap(), "3");
        assert!(EnginePacket::decode("").is_err());
        assert!(EnginePacket::decode("9").is_err());
    }

    #[test]
    fn test_outgoing_message_event_frame() {
        let packet = SocketPacket::event("/", "message", vec![json!("hello")]);
        assert_eq!(packet.to_frame().unwrap(), r#"42["message","hello"]"#);
    }

    #[test]
    fn test_decode_bot_response_event() {
        let packet = SocketPacket::decode(r#"2["botResponse","hi there",null]"#).unwrap();
        let (name, args) = packet.event_parts().unwrap();
        assert_eq!(name, "botResponse");
        assert_eq!(args, &[json!("hi there"), Value::Null]);
        assert_eq!(packet.namespace(), "/");
    }

    #[test]
    fn test_decode_namespace_and_ack_id() {
        let packet = SocketPacket::decode(r#"2/chat,12["message","yo"]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/chat".into(),
                id: Some(12),
                data: vec![json!("message"), json!("yo")],
            }
        );
        assert_eq!(packet.encode().unwrap(), r#"2/chat,12["message","yo"]"#);
    }

    #[test]
    fn test_decode_connect_variants() {
        assert_eq!(
            SocketPacket::decode(r#"0{"sid":"xyz"}"#).unwrap(),
            SocketPacket::Connect {
                namespace: "/".into(),
                data: Some(json!({"sid": "xyz"})),
            }
        );
        assert_eq!(SocketPacket::connect("/").encode().unwrap(), "0");
        assert_eq!(SocketPacket::disconnect("/").encode().unwrap(), "1");
        assert_eq!(
            SocketPacket::decode("1/admin").unwrap(),
            SocketPacket::Disconnect {
                namespace: "/admin".into()
            }
        );
    }

    #[test]
    fn test_decode_rejects_malformed_packets() {
        assert!(SocketPacket::decode("").is_err());
        assert!(SocketPacket::decode(r#"2{"not":"array"}"#).is_err());
        assert!(SocketPacket::decode("2").is_err());
        assert!(SocketPacket::decode(r#"51-["file",{"_placeholder":true,"num":0}]"#).is_err());
        assert!(SocketPacket::decode(r#"3["no id"]"#).is_err());
    }

    #[test]
    fn test_event_parts_requires_string_name() {
        let packet = SocketPacket::decode("2[42,\"x\"]").unwrap();
        assert!(packet.event_parts().is_none());
    }

    #[test]
    fn test_socket_endpoint_maps_schemes() {
        let url = socket_endpoint("https://ai-chat-api-syss.onrender.com").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://ai-chat-api-syss.onrender.com/socket.io/?EIO=4&transport=websocket"
        );

        let url = socket_endpoint("http://127.0.0.1:3000").unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket");

        let url = socket_endpoint("ws://localhost:8080/custom/").unwrap();
        assert_eq!(url.path(), "/custom/");
        assert_eq!(url.scheme(), "ws");
    }

    #[test]
    fn test_socket_endpoint_rejects_bad_urls() {
        assert!(socket_endpoint("").is_err());
        assert!(socket_endpoint("ftp://example.com").is_err());
        assert!(socket_endpoint("not a url").is_err());
    }
}
