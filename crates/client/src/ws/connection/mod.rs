//! Socket.IO channel connection with state management and auto-reconnect.
//!
//! This module provides the shared types and the transport-independent
//! protocol state machine, and conditionally includes the platform-specific
//! socket loop.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures_channel::mpsc::UnboundedSender;
use postlive_shared::{EventName, OutboundEvent, Packet, ProtocolError};
use serde_json::Value;
use thiserror::Error;

/// Connection state for the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts after the first failure (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 1.5,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let delay = self.initial_delay_ms as f32 * self.backoff_multiplier.powi(attempt as i32);
        (delay as u32).min(self.max_delay_ms)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

/// What the connection reports to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// `connection` counts completed handshakes, starting at 1.
    Connected { sid: Option<String>, connection: u64 },
    Disconnected { reason: String },
    ConnectError { message: String },
    /// A server event frame, not yet checked against its schema.
    Message { name: String, args: Vec<Value> },
}

impl ChannelEvent {
    /// Known name of the event, `None` for event frames the catalogue lacks.
    pub fn name(&self) -> Option<EventName> {
        match self {
            ChannelEvent::Connected { .. } => Some(EventName::Connect),
            ChannelEvent::Disconnected { .. } => Some(EventName::Disconnect),
            ChannelEvent::ConnectError { .. } => Some(EventName::ConnectError),
            ChannelEvent::Message { name, .. } => EventName::parse(name),
        }
    }
}

/// Invoked with the server's acknowledgment arguments.
pub type AckCallback = Box<dyn FnOnce(Vec<Value>) + Send>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,
    #[error("failed to encode event: {0}")]
    Encode(#[from] ProtocolError),
}

/// Outbound side of the channel: the emit primitives.
pub trait Emitter {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError>;

    fn emit_with_ack(&self, event: OutboundEvent, ack: AckCallback) -> Result<(), ChannelError>;

    /// Tear the connection down. Later emits fail with [`ChannelError::Closed`].
    fn close(&self);

    /// Tie later emits to `connection`. They are dropped instead of sent
    /// once that connection is gone.
    fn bind(&self, _connection: u64) {}
}

pub(crate) enum Command {
    Emit {
        event: OutboundEvent,
        ack: Option<AckCallback>,
        /// Connection the emit was made for; `None` waits for any.
        connection: Option<u64>,
    },
    Close,
}

/// Connection state shared between the socket loop and its handles.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedState(Arc<Mutex<Option<ConnectionState>>>);

impl SharedState {
    pub fn get(&self) -> ConnectionState {
        let guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().unwrap_or(ConnectionState::Disconnected)
    }

    pub fn set(&self, state: ConnectionState) {
        let mut guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(state);
    }
}

/// Handle for emitting events through a channel connection
#[derive(Clone)]
pub struct WsHandle {
    sender: UnboundedSender<Command>,
    state: SharedState,
    bound: Cell<Option<u64>>,
    pub url: String,
}

impl WsHandle {
    pub(crate) fn new(sender: UnboundedSender<Command>, state: SharedState, url: String) -> Self {
        Self {
            sender,
            state,
            bound: Cell::new(None),
            url,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    fn send(&self, command: Command) -> Result<(), ChannelError> {
        self.sender
            .unbounded_send(command)
            .map_err(|_| ChannelError::Closed)
    }
}

impl Emitter for WsHandle {
    fn emit(&self, event: OutboundEvent) -> Result<(), ChannelError> {
        crate::log_debug!("WsHandle::emit to '{}': {:?}", self.url, event);
        self.send(Command::Emit {
            event,
            ack: None,
            connection: self.bound.get(),
        })
    }

    fn emit_with_ack(&self, event: OutboundEvent, ack: AckCallback) -> Result<(), ChannelError> {
        crate::log_debug!("WsHandle::emit_with_ack to '{}': {:?}", self.url, event);
        self.send(Command::Emit {
            event,
            ack: Some(ack),
            connection: self.bound.get(),
        })
    }

    fn close(&self) {
        if self.send(Command::Close).is_ok() {
            crate::log_info!("Closing channel to {}", self.url);
        }
        self.sender.close_channel();
    }

    fn bind(&self, connection: u64) {
        self.bound.set(Some(connection));
    }
}

/// Why a single socket session ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SocketEnd {
    /// Closed on request; the loop stops.
    TornDown,
    /// Dropped after the handshake completed.
    Lost(String),
    /// Never completed the handshake.
    Failed(String),
}

/// What the socket loop has to do after an inbound frame.
#[derive(Debug, PartialEq)]
pub(crate) enum Step {
    Reply(String),
    Connected { sid: Option<String>, connection: u64 },
    Deliver(ChannelEvent),
    End(SocketEnd),
    Nothing,
}

/// Engine.IO/Socket.IO client state for one socket.
///
/// Unbound emits made before the namespace handshake completes are parked
/// in `pending` and flushed by [`SocketProtocol::take_pending`]. Emits bound
/// to a connection only ever go out on that connection.
#[derive(Default)]
pub(crate) struct SocketProtocol {
    connected: bool,
    /// Completed handshakes so far; the live connection's number while connected.
    connection: u64,
    next_ack_id: u64,
    acks: HashMap<u64, AckCallback>,
    pending: VecDeque<Command>,
}

impl SocketProtocol {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn on_text(&mut self, text: &str) -> Step {
        let packet = match Packet::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                crate::log_warn!("Dropping malformed frame {:?}: {}", text, e);
                return Step::Nothing;
            }
        };

        match packet {
            Packet::Open(handshake) => {
                crate::log_debug!("Engine.IO handshake: {}", handshake);
                Step::Reply(Packet::Connect(None).encode())
            }
            Packet::Ping(data) => Step::Reply(Packet::Pong(data).encode()),
            Packet::Pong(_) | Packet::Noop => Step::Nothing,
            Packet::Connect(info) => {
                self.connected = true;
                self.connection += 1;
                let sid = info
                    .as_ref()
                    .and_then(|v| v.get("sid"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Step::Connected {
                    sid,
                    connection: self.connection,
                }
            }
            Packet::ConnectError(err) => {
                let message = err
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());
                Step::End(SocketEnd::Failed(message))
            }
            Packet::Event { ack_id, name, args } => {
                if ack_id.is_some() {
                    crate::log_debug!("Server asked for an ack on '{}'; not answered", name);
                }
                Step::Deliver(ChannelEvent::Message { name, args })
            }
            Packet::Ack { ack_id, args } => {
                match self.acks.remove(&ack_id) {
                    Some(callback) => callback(args),
                    None => crate::log_debug!("Ack {} has no pending callback", ack_id),
                }
                Step::Nothing
            }
            Packet::Disconnect => Step::End(self.ended("io server disconnect")),
            Packet::Close => Step::End(self.ended("transport close")),
        }
    }

    /// End reason for a socket that stopped with `reason`.
    pub fn ended(&self, reason: &str) -> SocketEnd {
        if self.connected {
            SocketEnd::Lost(reason.to_string())
        } else {
            SocketEnd::Failed(reason.to_string())
        }
    }

    /// Encode an emit, park it until the handshake completes, or drop it
    /// when the connection it was bound to is gone.
    pub fn emit(
        &mut self,
        event: OutboundEvent,
        ack: Option<AckCallback>,
        connection: Option<u64>,
    ) -> Result<Option<String>, ProtocolError> {
        if let Some(bound) = connection {
            if !(self.connected && bound == self.connection) {
                crate::log_debug!(
                    "Dropping {:?} made for connection {}, now at {}",
                    event,
                    bound,
                    self.connection
                );
                return Ok(None);
            }
        }
        if !self.is_connected() {
            self.pending.push_back(Command::Emit {
                event,
                ack,
                connection,
            });
            return Ok(None);
        }

        let ack_id = ack.as_ref().map(|_| {
            let id = self.next_ack_id;
            self.next_ack_id += 1;
            id
        });
        let frame = event.to_packet(ack_id)?.encode();
        if let (Some(id), Some(callback)) = (ack_id, ack) {
            self.acks.insert(id, callback);
        }
        Ok(Some(frame))
    }

    /// Hold a command read while no socket is open.
    pub fn park(&mut self, command: Command) {
        if let Command::Emit {
            event,
            connection: Some(bound),
            ..
        } = &command
        {
            crate::log_debug!("Dropping {:?} made for lost connection {}", event, bound);
            return;
        }
        self.pending.push_back(command);
    }

    /// Emits parked while disconnected, oldest first.
    pub fn take_pending(&mut self) -> VecDeque<Command> {
        std::mem::take(&mut self.pending)
    }

    /// Start over for the next socket. Unbound parked emits survive, pending acks do not.
    pub fn reset(&mut self) {
        self.connected = false;
        if !self.acks.is_empty() {
            crate::log_debug!("Discarding {} unanswered acks", self.acks.len());
            self.acks.clear();
        }
    }
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
mod connection_wasm;
#[cfg(target_arch = "wasm32")]
pub use connection_wasm::WsConnection;

#[cfg(not(target_arch = "wasm32"))]
mod connection_native;
#[cfg(not(target_arch = "wasm32"))]
pub use connection_native::WsConnection;
