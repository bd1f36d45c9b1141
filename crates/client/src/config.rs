//! Client configuration.

use crate::ws::ReconnectConfig;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LIST_PATH: &str = "/web/posts";
pub const DEFAULT_SOCKET_PATH: &str = "/socket.io/";
pub const DEFAULT_POSTS_API_PATH: &str = "/posts";

/// Message sent with the `test_event` liveness probe.
pub const PROBE_MESSAGE: &str = "Hello from client";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the posts server, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Path of the list page. Detail pages live at `<list_path>/<id>`.
    pub list_path: String,
    /// Mount point of the Socket.IO endpoint.
    pub socket_path: String,
    /// JSON API collection; a single post is at `<posts_api_path>/<id>`.
    pub posts_api_path: String,
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            list_path: DEFAULT_LIST_PATH.to_string(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            posts_api_path: DEFAULT_POSTS_API_PATH.to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Read configuration from environment variables.
    ///
    /// - `POSTLIVE_BASE_URL` (default: `http://127.0.0.1:8000`)
    /// - `POSTLIVE_LIST_PATH` (default: `/web/posts`)
    /// - `POSTLIVE_SOCKET_PATH` (default: `/socket.io/`)
    /// - `POSTLIVE_POSTS_API_PATH` (default: `/posts`)
    /// - `POSTLIVE_MAX_RECONNECTS` (default: 10, 0 = retry forever)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("POSTLIVE_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        if let Ok(list_path) = std::env::var("POSTLIVE_LIST_PATH") {
            config = config.with_list_path(list_path);
        }
        if let Ok(socket_path) = std::env::var("POSTLIVE_SOCKET_PATH") {
            config.socket_path = socket_path;
        }
        if let Ok(posts_api_path) = std::env::var("POSTLIVE_POSTS_API_PATH") {
            config.posts_api_path = posts_api_path.trim_end_matches('/').to_string();
        }
        if let Some(max_attempts) = std::env::var("POSTLIVE_MAX_RECONNECTS")
            .ok()
            .and_then(|raw| raw.parse::<u32>().ok())
        {
            config.reconnect.max_attempts = max_attempts;
        }

        config
    }

    /// Derive the base URL from the page's own origin.
    #[cfg(target_arch = "wasm32")]
    pub fn from_location() -> Self {
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::default().with_base_url(origin)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_list_path(mut self, list_path: impl Into<String>) -> Self {
        let list_path = list_path.into();
        let trimmed = list_path.trim_end_matches('/');
        self.list_path = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Websocket endpoint: `ws(s)://<host><socket_path>?EIO=4&transport=websocket`.
    pub fn socket_url(&self) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        let path = if self.socket_path.starts_with('/') {
            self.socket_path.clone()
        } else {
            format!("/{}", self.socket_path)
        };
        format!("{base}{path}?EIO=4&transport=websocket")
    }

    /// Path of the JSON rendition of the list page.
    pub fn list_json_path(&self) -> String {
        format!("{}?format=json", self.list_path)
    }

    pub fn detail_path(&self, post_id: i64) -> String {
        format!("{}/{}", self.list_path, post_id)
    }

    /// Path of one post in the JSON API.
    pub fn post_json_path(&self, post_id: i64) -> String {
        format!("{}/{}", self.posts_api_path, post_id)
    }
}
