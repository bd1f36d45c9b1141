//! Channel module for real-time communication with the posts server.
//!
//! This module provides:
//! - The Socket.IO connection with auto-reconnect
//! - The event registry that routes inbound frames to typed domain events
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ChannelEvent    ┌───────────────┐   Routed    ┌──────────────────┐
//! │ WsConnection │ ────────────────► │ EventRegistry │ ──────────► │ RealtimeSession  │
//! │ (socket loop)│                   │ (subscribed   │             │ (rooms, list and │
//! └──────────────┘                   │  names only)  │             │  detail stores)  │
//!        ▲                           └───────────────┘             └──────────────────┘
//!        │                  emit / emit_with_ack (WsHandle)                 │
//!        └──────────────────────────────────────────────────────────────────┘
//! ```

mod connection;
mod registry;

pub use connection::{
    AckCallback, ChannelError, ChannelEvent, ConnectionState, Emitter, ReconnectConfig,
    WsConnection, WsHandle,
};
pub use registry::{EventRegistry, Routed};
