//! HTTP transport abstraction for the gateway client
//!
//! This module provides a trait-based transport that can be easily mocked for testing.
//! The executor, the renewal policy, and the stream reader only ever talk to
//! [`HttpTransport`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::header::{AsHeaderName, HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::CookieSession;
use crate::request::EncodedBody;

/// Chunked response body, read at most once
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// A fully built request, ready for the wire
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: EncodedBody,
}

/// Trait for sending HTTP requests
///
/// This abstraction allows easy mocking of HTTP calls in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends the request and returns the response with its body still unread.
    ///
    /// Only transport-level failures are errors; any HTTP status is a response.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Response from an HTTP request
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    body: Option<BodyStream>,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("readable", &self.body.is_some())
            .finish()
    }
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Option<BodyStream>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns true if status is in 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if status is 401
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Returns a header value if present and valid ASCII
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Declared `Content-Length`, if any
    pub fn content_length(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// Returns true if the response carries a body that can be read
    pub fn is_readable(&self) -> bool {
        self.body.is_some()
    }

    /// Hands over the raw chunk stream
    pub fn into_body_stream(self) -> Option<BodyStream> {
        self.body
    }

    /// Reads the whole body
    pub async fn bytes(self) -> Result<Bytes> {
        let Some(mut body) = self.body else {
            return Ok(Bytes::new());
        };

        let mut buf = Vec::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk.context("Failed to read response body")?);
        }
        Ok(Bytes::from(buf))
    }

    /// Reads the whole body as (lossy) UTF-8 text
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Production transport using reqwest
///
/// The session cookie jar is installed as the client's cookie provider, so every
/// request carries the session credential and every `Set-Cookie` updates it.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport bound to the given cookie jar
    pub fn new(session: Arc<CookieSession>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().cookie_provider(session);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: builder.build().context("Failed to create HTTP client")?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let builder = self
            .inner
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        let builder = match &request.body {
            EncodedBody::Empty => builder,
            EncodedBody::Json(text) => builder.body(text.clone()),
            EncodedBody::Form(pairs) => builder.form(pairs),
            EncodedBody::Multipart(form) => builder.multipart(form.to_reqwest()?),
            EncodedBody::Blob { data, .. } => builder.body(data.clone()),
        };

        let response = builder.send().await.context("Failed to send request")?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed();

        Ok(HttpResponse::new(status, headers, Some(body)))
    }
}
