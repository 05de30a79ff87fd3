//! Chat answer stream reader
//!
//! Drives an [`SseParser`] over a response body and turns each frame into a
//! handler callback. Every stream ends with exactly one terminal callback:
//! `on_done` or `on_error`.

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::parser::{SseFrame, SseParser};
use crate::api::{null_as_default, ChatSummary, Feedback, RelatedVideo};
use crate::error::ApiError;
use crate::http::BodyStream;

/// One decoded event of the chat stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatStreamEvent {
    Token {
        content: String,
    },
    Done {
        #[serde(default, deserialize_with = "null_as_default")]
        related_videos: Vec<RelatedVideo>,
        #[serde(default)]
        chat_log_id: Option<i64>,
        #[serde(default)]
        feedback: Option<Feedback>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}

const KNOWN_TYPES: [&str; 3] = ["token", "done", "error"];

/// Receives the events of one chat stream, in arrival order
pub trait ChatStreamHandler: Send {
    fn on_token(&mut self, content: &str);
    fn on_done(&mut self, summary: ChatSummary);
    fn on_error(&mut self, error: ApiError);
}

/// A [`ChatStreamHandler`] built from three closures
pub struct ChatCallbacks<T, D, E> {
    pub on_token: T,
    pub on_done: D,
    pub on_error: E,
}

impl<T, D, E> ChatStreamHandler for ChatCallbacks<T, D, E>
where
    T: FnMut(&str) + Send,
    D: FnMut(ChatSummary) + Send,
    E: FnMut(ApiError) + Send,
{
    fn on_token(&mut self, content: &str) {
        (self.on_token)(content);
    }

    fn on_done(&mut self, summary: ChatSummary) {
        (self.on_done)(summary);
    }

    fn on_error(&mut self, error: ApiError) {
        (self.on_error)(error);
    }
}

enum Flow {
    Continue,
    Stop,
}

enum FrameOutcome {
    Event(ChatStreamEvent),
    Unknown(String),
    Malformed(serde_json::Error),
}

/// Keeps whatever a `done` payload carries that still makes sense
///
/// The answer is complete once `done` arrives, so odd summary fields must not
/// turn it into a truncated stream.
fn salvage_done(value: &Value) -> ChatStreamEvent {
    let related_videos = value
        .get("related_videos")
        .and_then(Value::as_array)
        .map(|videos| {
            videos
                .iter()
                .filter_map(|video| serde_json::from_value(video.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    ChatStreamEvent::Done {
        related_videos,
        chat_log_id: value.get("chat_log_id").and_then(Value::as_i64),
        feedback: value
            .get("feedback")
            .and_then(|feedback| serde_json::from_value(feedback.clone()).ok()),
    }
}

fn decode_frame(frame: &SseFrame) -> FrameOutcome {
    match serde_json::from_str::<ChatStreamEvent>(&frame.data) {
        Ok(event) => FrameOutcome::Event(event),
        Err(e) => {
            let Ok(value) = serde_json::from_str::<Value>(&frame.data) else {
                return FrameOutcome::Malformed(e);
            };
            match value.get("type").and_then(Value::as_str) {
                Some("done") => {
                    tracing::warn!(error = %e, "Chat stream summary partly unreadable");
                    FrameOutcome::Event(salvage_done(&value))
                }
                // Well-formed JSON with an unrecognised type is skipped quietly
                Some(kind) if !KNOWN_TYPES.contains(&kind) => {
                    FrameOutcome::Unknown(kind.to_string())
                }
                _ => FrameOutcome::Malformed(e),
            }
        }
    }
}

fn dispatch(frame: &SseFrame, handler: &mut dyn ChatStreamHandler) -> Flow {
    match decode_frame(frame) {
        FrameOutcome::Event(ChatStreamEvent::Token { content }) => {
            handler.on_token(&content);
            Flow::Continue
        }
        FrameOutcome::Event(ChatStreamEvent::Done {
            related_videos,
            chat_log_id,
            feedback,
        }) => {
            handler.on_done(ChatSummary {
                related_videos,
                chat_log_id,
                feedback,
            });
            Flow::Stop
        }
        FrameOutcome::Event(ChatStreamEvent::Error { message }) => {
            let message = message.unwrap_or_else(|| "Unknown server error".to_string());
            tracing::warn!(%message, "Chat stream reported an error");
            handler.on_error(ApiError::Server(message));
            Flow::Stop
        }
        FrameOutcome::Unknown(kind) => {
            tracing::debug!(%kind, "Skipping chat stream frame of unknown type");
            Flow::Continue
        }
        FrameOutcome::Malformed(e) => {
            tracing::warn!(error = %e, data = %frame.data, "Skipping malformed chat stream frame");
            Flow::Continue
        }
    }
}

/// Reads `body` to its terminal event, invoking `handler` along the way
///
/// The cancellation token is checked before each read and raced against it.
pub async fn read_chat_stream(
    body: Option<BodyStream>,
    handler: &mut dyn ChatStreamHandler,
    cancel: &CancellationToken,
) {
    let Some(mut body) = body else {
        handler.on_error(ApiError::UnreadableBody);
        return;
    };

    let mut parser = SseParser::new();
    loop {
        if cancel.is_cancelled() {
            handler.on_error(ApiError::Cancelled);
            return;
        }

        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                handler.on_error(ApiError::Cancelled);
                return;
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                parser.push(&chunk);
                while let Some(frame) = parser.next_frame() {
                    if let Flow::Stop = dispatch(&frame, handler) {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                handler.on_error(ApiError::network(&e));
                return;
            }
            None => break,
        }
    }

    if let Some(frame) = parser.finish() {
        if let Flow::Stop = dispatch(&frame, handler) {
            return;
        }
    }

    tracing::warn!("Chat stream ended without a terminal event");
    handler.on_error(ApiError::StreamClosed);
}
