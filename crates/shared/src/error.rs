//! Shared error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to decode or encode a channel frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,
    #[error("unknown packet type {0:?}")]
    UnknownPacketType(char),
    #[error("unsupported packet type {0:?}")]
    Unsupported(char),
    #[error("invalid ack id in {0:?}")]
    InvalidAckId(String),
    #[error("event packet without a name")]
    MissingEventName,
    #[error("unknown event {0:?}")]
    UnknownEvent(String),
    #[error("payload for {event} does not match its schema: {source}")]
    Payload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error body the posts server attaches to failed requests (`{"detail": ...}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// Pull a user-facing message out of an error response body, if it has one.
pub fn try_error_detail(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    parsed.detail.filter(|detail| !detail.trim().is_empty())
}

/// Failure of the side-channel HTTP fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Network(String),
    Http { status: u16, body: String },
    Deserialize(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { status, body } => match try_error_detail(body) {
                Some(detail) => write!(f, "HTTP {}: {}", status, detail),
                None => write!(f, "HTTP {}: {}", status, body),
            },
            ApiError::Deserialize(msg) => write!(f, "Deserialization error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
