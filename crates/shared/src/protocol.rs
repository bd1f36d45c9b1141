//! Event catalogue for the posts channel: names and payload schemas.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::models::{JoinPostRoom, NewPostPayload, PostUpdatePayload, TestEventPayload};
use crate::packet::Packet;

/// Every event name the client knows about, inbound and outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Connect,
    Disconnect,
    ConnectError,
    PostsListUpdate,
    NewPost,
    PostUpdate,
    TestEvent,
    JoinPostRoom,
}

impl EventName {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventName::Connect => "connect",
            EventName::Disconnect => "disconnect",
            EventName::ConnectError => "connect_error",
            EventName::PostsListUpdate => "posts_list_update",
            EventName::NewPost => "new_post",
            EventName::PostUpdate => "post_update",
            EventName::TestEvent => "test_event",
            EventName::JoinPostRoom => "join_post_room",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "connect" => EventName::Connect,
            "disconnect" => EventName::Disconnect,
            "connect_error" => EventName::ConnectError,
            "posts_list_update" => EventName::PostsListUpdate,
            "new_post" => EventName::NewPost,
            "post_update" => EventName::PostUpdate,
            "test_event" => EventName::TestEvent,
            "join_post_room" => EventName::JoinPostRoom,
            _ => return None,
        })
    }

    /// Raised by the connection itself rather than carried in an event frame.
    pub const fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            EventName::Connect | EventName::Disconnect | EventName::ConnectError
        )
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain events pushed by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// The list changed; the payload carries no data.
    PostsListUpdate,
    NewPost(NewPostPayload),
    PostUpdate(PostUpdatePayload),
}

impl InboundEvent {
    pub fn name(&self) -> EventName {
        match self {
            InboundEvent::PostsListUpdate => EventName::PostsListUpdate,
            InboundEvent::NewPost(_) => EventName::NewPost,
            InboundEvent::PostUpdate(_) => EventName::PostUpdate,
        }
    }

    /// Check the first event argument against the schema for `name`.
    pub fn decode(name: &str, args: &[Value]) -> Result<Self, ProtocolError> {
        let payload = args.first().cloned().unwrap_or(Value::Null);
        match EventName::parse(name) {
            Some(EventName::PostsListUpdate) => Ok(InboundEvent::PostsListUpdate),
            Some(EventName::NewPost) => Ok(InboundEvent::NewPost(payload_as(
                EventName::NewPost,
                payload,
            )?)),
            Some(EventName::PostUpdate) => Ok(InboundEvent::PostUpdate(payload_as(
                EventName::PostUpdate,
                payload,
            )?)),
            _ => Err(ProtocolError::UnknownEvent(name.to_string())),
        }
    }
}

fn payload_as<T: DeserializeOwned>(event: EventName, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::Payload {
        event: event.as_str(),
        source,
    })
}

/// Events the client emits.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Liveness probe, answered with an ack.
    TestEvent(TestEventPayload),
    JoinPostRoom(JoinPostRoom),
}

impl OutboundEvent {
    pub fn name(&self) -> EventName {
        match self {
            OutboundEvent::TestEvent(_) => EventName::TestEvent,
            OutboundEvent::JoinPostRoom(_) => EventName::JoinPostRoom,
        }
    }

    pub fn payload(&self) -> Result<Value, ProtocolError> {
        let value = match self {
            OutboundEvent::TestEvent(payload) => serde_json::to_value(payload)?,
            OutboundEvent::JoinPostRoom(payload) => serde_json::to_value(payload)?,
        };
        Ok(value)
    }

    pub fn to_packet(&self, ack_id: Option<u64>) -> Result<Packet, ProtocolError> {
        Ok(Packet::event(self.name().as_str(), self.payload()?, ack_id))
    }
}
