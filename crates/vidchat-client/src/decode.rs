//! Tolerant response decoding
//!
//! Several endpoints legitimately answer with an empty success body, so every
//! "nothing to decode" situation degrades to an empty JSON object instead of an
//! error.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::http::HttpResponse;

/// The `{}` sentinel
pub fn empty_payload() -> Value {
    Value::Object(Map::new())
}

/// Returns true for `application/json` and `*+json` media types
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Parses text as JSON, degrading blank or malformed text to `{}`
pub fn parse_tolerant(text: &str) -> Value {
    if text.trim().is_empty() {
        return empty_payload();
    }
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Response body is not valid JSON, using empty payload");
            empty_payload()
        }
    }
}

/// Decodes a successful response body into a JSON value
///
/// Returns `{}` when `Content-Length` is zero, when the content type is not JSON
/// and no length is declared, when the body is blank, or when it fails to parse.
pub async fn decode_json(response: HttpResponse) -> Result<Value, ApiError> {
    let content_length = response.content_length();
    if content_length == Some(0) {
        return Ok(empty_payload());
    }
    if !is_json_content_type(response.content_type()) && content_length.is_none() {
        return Ok(empty_payload());
    }

    let text = response.text().await.map_err(|e| ApiError::network(&e))?;
    Ok(parse_tolerant(&text))
}

/// Deserializes a decoded payload into a typed value
pub fn decode_into<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(value)?)
}
