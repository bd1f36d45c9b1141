//! Postlive Client - realtime reconciliation for the posts pages
//!
//! This crate keeps a rendered posts list and post detail view in sync with
//! changes other users make, driven by Socket.IO events from the server.
//! It builds for the browser (`wasm32`, rendering into the DOM) and for
//! native targets (rendering into the terminal).

pub mod logging;

pub mod api_client;
pub mod config;
pub mod page;
pub mod render;
pub mod rooms;
pub mod session;
pub mod shell;
pub mod stores;
pub mod ws;

pub use api_client::{ApiClient, PostsSource};
pub use config::ClientConfig;
pub use page::Page;
pub use render::{Navigator, Notifier, Renderer, Shell};
pub use session::{Flow, RealtimeSession};
