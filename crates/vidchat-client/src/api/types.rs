use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::MultipartForm;

/// Deserializes `null` the same as a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// An uploaded video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Processing status reported by the backend (`pending`, `completed`, ...)
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// An ordered collection of videos that can be chatted with as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGroup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub video_count: Option<i64>,
    #[serde(default)]
    pub share_token: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl VideoGroup {
    /// Number of videos, preferring the count reported by the backend
    pub fn len(&self) -> usize {
        self.video_count
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(self.videos.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat turn: the conversation so far, scoped to a group or a shared group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}

impl ChatRequest {
    /// Chat over every video the user can see
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            group_id: None,
            share_token: None,
        }
    }

    pub fn for_group(messages: Vec<ChatMessage>, group_id: i64) -> Self {
        Self {
            group_id: Some(group_id),
            ..Self::new(messages)
        }
    }

    /// Chat over a group shared by link; works without a session
    pub fn for_share(messages: Vec<ChatMessage>, share_token: impl Into<String>) -> Self {
        Self {
            share_token: Some(share_token.into()),
            ..Self::new(messages)
        }
    }
}

/// The user's rating of an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Good,
    Bad,
    #[serde(other)]
    Other,
}

/// A video the answer drew on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedVideo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub video_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Backend-specific extras (timestamps, scores, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Everything a finished answer carries besides its text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_videos: Vec<RelatedVideo>,
    #[serde(default)]
    pub chat_log_id: Option<i64>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

/// A complete (non-streamed) answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, alias = "response", deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_videos: Vec<RelatedVideo>,
    #[serde(default)]
    pub chat_log_id: Option<i64>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

impl ChatResponse {
    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            related_videos: self.related_videos.clone(),
            chat_log_id: self.chat_log_id,
            feedback: self.feedback,
        }
    }
}

/// One question and answer from a group's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLog {
    pub id: i64,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub related_videos: Vec<RelatedVideo>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub share_token: String,
    #[serde(default)]
    pub share_url: Option<String>,
}

/// A video file to upload
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub data: Bytes,
}

impl VideoUpload {
    pub(crate) fn to_form(&self) -> MultipartForm {
        MultipartForm::new()
            .text("title", self.title.clone())
            .text("description", self.description.clone())
            .file(
                "file",
                self.file_name.clone(),
                self.mime.clone(),
                self.data.clone(),
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Filters for the video list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoQuery {
    pub q: Option<String>,
    pub tag: Option<i64>,
    pub status: Option<String>,
}

impl VideoQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            pairs.push(("q", q.to_string()));
        }
        if let Some(tag) = self.tag {
            pairs.push(("tags", tag.to_string()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A list endpoint's payload: a bare array or a paginated envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListPayload<T> {
    Plain(Vec<T>),
    Paged {
        #[serde(default = "Vec::new")]
        results: Vec<T>,
    },
}

impl<T> ListPayload<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Plain(items) | Self::Paged { results: items } => items,
        }
    }
}
