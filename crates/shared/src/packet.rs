//! Text codec for Engine.IO v4 / Socket.IO v4 frames on the websocket transport.
//!
//! Only the default namespace and text frames are used by the posts server, so
//! binary events are rejected and namespace prefixes are skipped.
//!
//! ```text
//! 0{"sid":..}          engine open
//! 2 / 3                ping / pong
//! 40{"sid":..}         socket connected
//! 42["new_post",{..}]  event
//! 421["test_event",..] event expecting ack 1
//! 431[{..}]            ack 1
//! 44{"message":..}     connect error
//! ```

use serde_json::Value;

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake sent by the server when the socket opens.
    Open(Value),
    Close,
    Ping(Option<String>),
    Pong(Option<String>),
    Noop,
    /// Socket.IO namespace connect. Client sends it bare, server answers with `{sid}`.
    Connect(Option<Value>),
    Disconnect,
    Event {
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError(Value),
}

impl Packet {
    pub fn event(name: impl Into<String>, payload: Value, ack_id: Option<u64>) -> Self {
        Packet::Event {
            ack_id,
            name: name.into(),
            args: vec![payload],
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let kind = text.chars().next().ok_or(ProtocolError::Empty)?;
        let rest = &text[kind.len_utf8()..];

        match kind {
            '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping(non_empty(rest))),
            '3' => Ok(Packet::Pong(non_empty(rest))),
            '4' => decode_socket(rest),
            '6' => Ok(Packet::Noop),
            '5' => Err(ProtocolError::Unsupported(kind)),
            other => Err(ProtocolError::UnknownPacketType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Packet::Open(handshake) => format!("0{}", handshake),
            Packet::Close => "1".to_string(),
            Packet::Ping(data) => format!("2{}", data.as_deref().unwrap_or_default()),
            Packet::Pong(data) => format!("3{}", data.as_deref().unwrap_or_default()),
            Packet::Noop => "6".to_string(),
            Packet::Connect(None) => "40".to_string(),
            Packet::Connect(Some(auth)) => format!("40{}", auth),
            Packet::Disconnect => "41".to_string(),
            Packet::Event { ack_id, name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("42{}{}", ack_prefix(*ack_id), Value::Array(items))
            }
            Packet::Ack { ack_id, args } => format!("43{}{}", ack_id, Value::Array(args.clone())),
            Packet::ConnectError(err) => format!("44{}", err),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn ack_prefix(ack_id: Option<u64>) -> String {
    ack_id.map(|id| id.to_string()).unwrap_or_default()
}

fn decode_socket(text: &str) -> Result<Packet, ProtocolError> {
    let kind = text.chars().next().ok_or(ProtocolError::Empty)?;
    let mut body = &text[kind.len_utf8()..];

    if let Some(nsp) = body.strip_prefix('/') {
        body = match nsp.find(',') {
            Some(idx) => &nsp[idx + 1..],
            None => "",
        };
    }

    match kind {
        '0' => {
            if body.is_empty() {
                Ok(Packet::Connect(None))
            } else {
                Ok(Packet::Connect(Some(serde_json::from_str(body)?)))
            }
        }
        '1' => Ok(Packet::Disconnect),
        '2' => {
            let (ack_id, json) = split_ack_id(body)?;
            let mut args: Vec<Value> = serde_json::from_str(json)?;
            if args.is_empty() {
                return Err(ProtocolError::MissingEventName);
            }
            let Value::String(name) = args.remove(0) else {
                return Err(ProtocolError::MissingEventName);
            };
            Ok(Packet::Event { ack_id, name, args })
        }
        '3' => {
            let (ack_id, json) = split_ack_id(body)?;
            let ack_id = ack_id.ok_or_else(|| ProtocolError::InvalidAckId(body.to_string()))?;
            let args: Vec<Value> = serde_json::from_str(json)?;
            Ok(Packet::Ack { ack_id, args })
        }
        '4' => {
            if body.is_empty() {
                Ok(Packet::ConnectError(Value::Null))
            } else {
                Ok(Packet::ConnectError(serde_json::from_str(body)?))
            }
        }
        '5' | '6' => Err(ProtocolError::Unsupported(kind)),
        other => Err(ProtocolError::UnknownPacketType(other)),
    }
}

fn split_ack_id(body: &str) -> Result<(Option<u64>, &str), ProtocolError> {
    let end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    if end == 0 {
        return Ok((None, body));
    }
    let id = body[..end]
        .parse::<u64>()
        .map_err(|_| ProtocolError::InvalidAckId(body[..end].to_string()))?;
    Ok((Some(id), &body[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_engine_frames() {
        assert_eq!(
            Packet::decode(r#"0{"sid":"abc","pingInterval":25000}"#).unwrap(),
            Packet::Open(json!({"sid": "abc", "pingInterval": 25000}))
        );
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping(None));
        assert_eq!(
            Packet::decode("3probe").unwrap(),
            Packet::Pong(Some("probe".into()))
        );
        assert_eq!(Packet::decode("1").unwrap(), Packet::Close);
    }

    #[test]
    fn decodes_connect_and_connect_error() {
        assert_eq!(
            Packet::decode(r#"40{"sid":"xyz"}"#).unwrap(),
            Packet::Connect(Some(json!({"sid": "xyz"})))
        );
        assert_eq!(
            Packet::decode(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError(json!({"message": "Not authorized"}))
        );
        assert_eq!(Packet::decode("41").unwrap(), Packet::Disconnect);
    }

    #[test]
    fn decodes_events_with_and_without_ack() {
        let plain = Packet::decode(r#"42["posts_list_update",{}]"#).unwrap();
        assert_eq!(
            plain,
            Packet::Event {
                ack_id: None,
                name: "posts_list_update".into(),
                args: vec![json!({})],
            }
        );

        let acked = Packet::decode(r#"4217["test_event",{"message":"hi"}]"#).unwrap();
        assert_eq!(
            acked,
            Packet::Event {
                ack_id: Some(17),
                name: "test_event".into(),
                args: vec![json!({"message": "hi"})],
            }
        );
    }

    #[test]
    fn skips_namespace_prefix() {
        let packet = Packet::decode(r#"42/admin,3["new_post",{}]"#).unwrap();
        assert!(matches!(packet, Packet::Event { ack_id: Some(3), ref name, .. } if name == "new_post"));
    }

    #[test]
    fn decodes_ack() {
        assert_eq!(
            Packet::decode(r#"431[{"status":"success"}]"#).unwrap(),
            Packet::Ack {
                ack_id: 1,
                args: vec![json!({"status": "success"})],
            }
        );
        assert!(matches!(
            Packet::decode(r#"43[{}]"#),
            Err(ProtocolError::InvalidAckId(_))
        ));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(Packet::decode(""), Err(ProtocolError::Empty)));
        assert!(matches!(
            Packet::decode("9"),
            Err(ProtocolError::UnknownPacketType('9'))
        ));
        assert!(matches!(
            Packet::decode("451-[\"x\",{}]"),
            Err(ProtocolError::Unsupported('5'))
        ));
        assert!(matches!(
            Packet::decode("42[]"),
            Err(ProtocolError::MissingEventName)
        ));
        assert!(matches!(
            Packet::decode("42[1,2]"),
            Err(ProtocolError::MissingEventName)
        ));
        assert!(matches!(Packet::decode("42[oops"), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn encodes_client_frames() {
        assert_eq!(Packet::Connect(None).encode(), "40");
        assert_eq!(Packet::Pong(None).encode(), "3");
        assert_eq!(
            Packet::event("join_post_room", json!({"post_id": 42}), None).encode(),
            r#"42["join_post_room",{"post_id":42}]"#
        );
        assert_eq!(
            Packet::event("test_event", json!({"message": "Hello from client"}), Some(0)).encode(),
            r#"420["test_event",{"message":"Hello from client"}]"#
        );
        assert_eq!(
            Packet::Ack {
                ack_id: 4,
                args: vec![json!("ok")],
            }
            .encode(),
            r#"434["ok"]"#
        );
    }
}
