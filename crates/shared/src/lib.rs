//! Shared types for the postlive realtime layer: wire models, the event
//! catalogue and the Socket.IO packet codec.

pub mod error;
pub mod models;
pub mod packet;
pub mod protocol;

pub use error::*;
pub use models::*;
pub use packet::Packet;
pub use protocol::*;
