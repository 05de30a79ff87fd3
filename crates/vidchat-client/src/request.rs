//! Request descriptors, URL/header building, and body encoding

use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpRequest;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Body of a logical request
///
/// Every variant is cheap to clone so the single authentication retry can
/// re-issue exactly the same body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Plain object body, serialized to JSON text on the wire
    Json(Value),
    /// URL-encoded form fields
    Form(Vec<(String, String)>),
    Multipart(MultipartForm),
    /// Opaque binary payload
    Blob {
        content_type: Option<String>,
        data: Bytes,
    },
}

impl RequestBody {
    /// Converts any serializable value into a JSON body
    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Ok(Self::Json(serde_json::to_value(body)?))
    }
}

/// Body as it goes on the wire
#[derive(Debug, Clone)]
pub enum EncodedBody {
    Empty,
    Json(String),
    Form(Vec<(String, String)>),
    Multipart(MultipartForm),
    Blob {
        content_type: Option<String>,
        data: Bytes,
    },
}

impl EncodedBody {
    /// Content type the body dictates, if the encoder is responsible for it
    ///
    /// Form and multipart bodies get theirs from the transport (the multipart
    /// boundary is only known there).
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Json(_) => Some(JSON_CONTENT_TYPE),
            Self::Blob { content_type, .. } => content_type.as_deref(),
            _ => None,
        }
    }

    /// JSON text of the body, if it is a JSON body
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Self::Json(text) => Some(text),
            _ => None,
        }
    }
}

/// Serializes plain object bodies to JSON; passes every other body through unchanged
pub fn encode_body(body: &RequestBody) -> Result<EncodedBody, ApiError> {
    Ok(match body {
        RequestBody::Empty => EncodedBody::Empty,
        RequestBody::Json(value) => EncodedBody::Json(serde_json::to_string(value)?),
        RequestBody::Form(pairs) => EncodedBody::Form(pairs.clone()),
        RequestBody::Multipart(form) => EncodedBody::Multipart(form.clone()),
        RequestBody::Blob { content_type, data } => EncodedBody::Blob {
            content_type: content_type.clone(),
            data: data.clone(),
        },
    })
}

/// Multipart form whose parts can be rebuilt for every send
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<(String, FormPart)>,
}

#[derive(Debug, Clone)]
pub enum FormPart {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        data: Bytes,
    },
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Adds a file field
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<String>,
        data: Bytes,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                file_name: file_name.into(),
                mime,
                data,
            },
        ));
        self
    }

    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }

    /// Builds a fresh reqwest form; reqwest forms are consumed by each send
    pub fn to_reqwest(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, part) in &self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name.clone(), value.clone()),
                FormPart::File {
                    file_name,
                    mime,
                    data,
                } => {
                    let mut file =
                        reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file
                            .mime_str(mime)
                            .with_context(|| format!("Invalid MIME type: {mime}"))?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// One logical call against the backend
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub endpoint: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Number of times this request was re-issued after a session refresh (0 or 1)
    pub retry_count: u32,
    /// Whether a 401 on this request may trigger a session refresh
    pub auth_retry: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            retry_count: 0,
            auth_retry: true,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PATCH, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets a JSON body from any serializable value
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        Ok(self.body(RequestBody::json(body)?))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Marks the request as part of the authentication flow itself
    ///
    /// A 401 on such a request is an ordinary error, never a refresh trigger.
    pub fn without_auth_retry(mut self) -> Self {
        self.auth_retry = false;
        self
    }

    /// Resolves the descriptor into a wire request against `base_url`
    pub fn build(&self, base_url: &str) -> Result<HttpRequest, ApiError> {
        let body = encode_body(&self.body)?;

        let mut headers = baseline_headers();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        if !headers.contains_key(CONTENT_TYPE) {
            if let Some(content_type) = body.content_type() {
                if let Ok(value) = HeaderValue::from_str(content_type) {
                    headers.insert(CONTENT_TYPE, value);
                }
            }
        }

        Ok(HttpRequest {
            method: self.method.clone(),
            url: build_url(base_url, &self.endpoint),
            headers,
            body,
        })
    }
}

/// Headers every request starts from
pub fn baseline_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers
}

/// Joins the base URL and an endpoint with exactly one slash between them
///
/// Absolute endpoints are returned unchanged.
pub fn build_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Appends percent-encoded query parameters to an endpoint
pub fn with_query<K, V>(endpoint: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return endpoint.to_string();
    }

    let query = params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{endpoint}{separator}{query}")
}
