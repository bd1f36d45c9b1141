//! Wire models for posts and the payloads carried by channel events.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity key of a post.
pub type PostId = i64;

// --- Posts ---

/// A post as the server sends it.
///
/// `author` is missing from `new_post` pushes and `content` is missing from the
/// list endpoint, so both are optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub published: bool,
    /// ISO-8601 timestamp, kept verbatim.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Post {
    /// Parse `created_at`.
    ///
    /// Accepts RFC 3339 and, failing that, a naive ISO-8601 timestamp which is
    /// taken to be UTC.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    /// Overwrite the fields present in `patch`, leaving the rest untouched.
    pub fn apply_patch(&mut self, patch: &PostPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = Some(content.clone());
        }
        if let Some(published) = patch.published {
            self.published = published;
        }
        if let Some(author_id) = patch.author_id {
            self.author_id = Some(author_id);
        }
        if let Some(updated_at) = &patch.updated_at {
            self.updated_at = Some(updated_at.clone());
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Partial post carried by `post_update`. Absent fields mean "unchanged".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.published.is_none()
            && self.author_id.is_none()
            && self.updated_at.is_none()
    }
}

/// Body of `GET <list>?format=json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
}

// --- Inbound payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPostPayload {
    pub post: Post,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PostUpdateKind {
    Update,
    Delete,
    /// `create` and anything else the server may add later.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostUpdatePayload {
    pub post_id: PostId,
    #[serde(rename = "type")]
    pub kind: PostUpdateKind,
    #[serde(default)]
    pub data: Option<PostPatch>,
}

// --- Outbound payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestEventPayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinPostRoom {
    pub post_id: PostId,
}
