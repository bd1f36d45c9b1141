//! HTTP client for the side-channel posts fetch.

use async_trait::async_trait;
use postlive_shared::{ApiError, Post, PostId, PostsResponse};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;

/// Where a full refresh gets the current list from, and a detail page its post.
#[async_trait(?Send)]
pub trait PostsSource {
    async fn fetch_posts(&self) -> Result<Vec<Post>, ApiError>;

    async fn fetch_post(&self, post_id: PostId) -> Result<Post, ApiError>;
}

/// HTTP client for making read requests to the posts server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    list_json_path: String,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new() -> Self {
        let config = ClientConfig::default();
        Self {
            client: Client::new(),
            base_url: String::new(),
            list_json_path: config.list_json_path(),
            config,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            config: config.clone(),
            ..Self::new()
        }
        .with_base_url(config.base_url.clone())
        .with_list_json_path(config.list_json_path())
    }

    /// Set the base URL for API requests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_list_json_path(mut self, path: impl Into<String>) -> Self {
        self.list_json_path = path.into();
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let url = self.url(path);
        crate::log_debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();

        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("failed to read body: {e}")))?;

        if !is_success {
            return Err(ApiError::Http { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl PostsSource for ApiClient {
    async fn fetch_posts(&self) -> Result<Vec<Post>, ApiError> {
        let response: PostsResponse = self.get_json(&self.list_json_path).await?;
        Ok(response.posts)
    }

    async fn fetch_post(&self, post_id: PostId) -> Result<Post, ApiError> {
        self.get_json(&self.config.post_json_path(post_id)).await
    }
}
