//! Error taxonomy and backend error-body classification

use serde_json::Value;

use crate::decode::parse_tolerant;
use crate::http::HttpResponse;

/// Message returned when a session could not be renewed
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Please log in again.";

/// Errors surfaced by the gateway client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The transport rejected the request before a response arrived
    #[error("{0}")]
    Network(String),
    /// The backend answered with a non-2xx, non-401 status
    #[error("{message}")]
    Http { status: u16, message: String },
    /// A 401 survived the single refresh attempt, or the refresh itself failed
    #[error("{}", AUTH_FAILED_MESSAGE)]
    AuthFailed,
    /// A streaming response arrived without a body to read
    #[error("Response body is not readable")]
    UnreadableBody,
    /// The chat stream reported an error frame
    #[error("{0}")]
    Server(String),
    /// The chat stream ended without a `done` or `error` frame
    #[error("Stream ended before completion")]
    StreamClosed,
    #[error("Request cancelled")]
    Cancelled,
    /// A downloaded file could not be written
    #[error("Failed to save download: {0:#}")]
    Save(anyhow::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Wraps a transport failure, keeping the full context chain as the message
    pub fn network(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        if message.trim().is_empty() {
            Self::Network("Unknown error".to_string())
        } else {
            Self::Network(message)
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true when the caller must send the user back to login
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed)
    }
}

const PRIMARY_FIELDS: [&str; 3] = ["detail", "message", "non_field_errors"];

/// Picks the most useful human-readable message out of an error body.
///
/// Precedence: `detail`, `message`, `non_field_errors[0]`, the first element of
/// the first remaining field holding a non-empty array, and finally a generic
/// status message. Empty strings count as absent.
pub fn classify_error_body(body: &Value, status: u16) -> String {
    let fallback = || format!("HTTP error! status: {status}");
    let Some(fields) = body.as_object() else {
        return fallback();
    };

    if let Some(message) = fields.get("detail").and_then(message_text) {
        return message;
    }
    if let Some(message) = fields.get("message").and_then(message_text) {
        return message;
    }
    if let Some(message) = fields.get("non_field_errors").and_then(first_item) {
        return message;
    }

    fields
        .iter()
        .filter(|(key, _)| !PRIMARY_FIELDS.contains(&key.as_str()))
        .find_map(|(_, value)| first_item(value))
        .unwrap_or_else(fallback)
}

fn first_item(value: &Value) -> Option<String> {
    value.as_array()?.first().and_then(message_text)
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Consumes a failed response and turns its body into an [`ApiError::Http`]
pub(crate) async fn http_error(response: HttpResponse) -> ApiError {
    let status = response.status;
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(status, error = %e, "Failed to read error body");
            String::new()
        }
    };
    let body = parse_tolerant(&text);
    ApiError::Http {
        status,
        message: classify_error_body(&body, status),
    }
}
