use reqwest::header::{HeaderValue, ACCEPT, CONTENT_DISPOSITION};
use serde_json::json;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::types::{ChatLog, ChatRequest, ChatResponse, Feedback, ListPayload};
use crate::client::ApiClient;
use crate::download::{resolve_export_filename, DownloadDescriptor};
use crate::error::ApiError;
use crate::http::HttpTransport;
use crate::request::{with_query, RequestDescriptor, EVENT_STREAM_CONTENT_TYPE};
use crate::sse::{read_chat_stream, ChatStreamHandler};

pub const CHAT_ENDPOINT: &str = "/chat/";
pub const CHAT_STREAM_ENDPOINT: &str = "/chat/stream/";
const HISTORY_ENDPOINT: &str = "/chat/history/";
const EXPORT_ENDPOINT: &str = "/chat/history/export/";
const FEEDBACK_ENDPOINT: &str = "/chat/feedback/";

impl<T: HttpTransport> ApiClient<T> {
    /// Asks a question and waits for the whole answer
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.request_json(RequestDescriptor::post(CHAT_ENDPOINT).json(request)?)
            .await
    }

    /// Asks a question and streams the answer into `handler`
    ///
    /// The handler receives exactly one terminal callback. Failures before the
    /// first byte, an exhausted session included, arrive through `on_error`.
    /// Pass a token from [`ApiClient::cancellation_token`] so that
    /// [`ApiClient::shutdown`] ends the stream as well.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        handler: &mut dyn ChatStreamHandler,
        cancel: &CancellationToken,
    ) {
        let descriptor = RequestDescriptor::post(CHAT_STREAM_ENDPOINT)
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM_CONTENT_TYPE))
            .json(request);
        let descriptor = match descriptor {
            Ok(descriptor) => descriptor,
            Err(e) => {
                handler.on_error(e);
                return;
            }
        };

        match self.execute_with_cancel(descriptor, cancel).await {
            Ok(response) => {
                tracing::debug!(status = response.status, "Chat stream opened");
                read_chat_stream(response.into_body_stream(), handler, cancel).await;
            }
            Err(e) => handler.on_error(e),
        }
    }

    /// Questions and answers previously asked of a group
    pub async fn chat_history(&self, group_id: i64) -> Result<Vec<ChatLog>, ApiError> {
        let endpoint = with_query(HISTORY_ENDPOINT, &[("group_id", group_id.to_string())]);
        let logs: ListPayload<ChatLog> = self.request_json(RequestDescriptor::get(endpoint)).await?;
        Ok(logs.into_vec())
    }

    /// Rates an answer; `None` withdraws a previous rating
    pub async fn set_feedback(
        &self,
        chat_log_id: i64,
        feedback: Option<Feedback>,
    ) -> Result<(), ApiError> {
        let body = json!({ "chat_log_id": chat_log_id, "feedback": feedback });
        self.request_empty(RequestDescriptor::post(FEEDBACK_ENDPOINT).json(&body)?)
            .await
    }

    /// Downloads a group's chat history as CSV and saves it
    ///
    /// Returns where the file was written.
    pub async fn export_chat_history(&self, group_id: i64) -> Result<PathBuf, ApiError> {
        let endpoint = with_query(EXPORT_ENDPOINT, &[("group_id", group_id.to_string())]);
        let request =
            RequestDescriptor::get(endpoint).header(ACCEPT, HeaderValue::from_static("text/csv"));

        let response = self.execute(request).await?;
        let filename = resolve_export_filename(response.header(CONTENT_DISPOSITION), group_id);
        let bytes = response.bytes().await.map_err(|e| ApiError::network(&e))?;

        tracing::info!(group_id, %filename, bytes = bytes.len(), "Chat history exported");
        self.saver
            .save(DownloadDescriptor { bytes, filename })
            .await
            .map_err(ApiError::Save)
    }
}
