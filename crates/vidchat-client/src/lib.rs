//! Gateway client for the video chat backend
//!
//! One [`ApiClient`] carries every call: it attaches the session cookie,
//! renews an expired session once per request, decodes tolerant JSON payloads,
//! streams chat answers over Server-Sent Events and saves CSV exports.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod decode;
pub mod download;
pub mod error;
pub mod http;
pub mod navigate;
pub mod request;
pub mod sse;

#[cfg(test)]
mod testutil;

pub use client::ApiClient;
pub use config::{ClientConfig, ConfigManager};
pub use error::ApiError;
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use request::{RequestBody, RequestDescriptor};
pub use sse::{ChatCallbacks, ChatStreamHandler};
