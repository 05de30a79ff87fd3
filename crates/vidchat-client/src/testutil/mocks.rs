//! Mock implementations for testing
//!
//! This module re-exports mock implementations from their respective modules
//! for convenient access in tests.

use crate::api::ChatSummary;
use crate::error::ApiError;
use crate::sse::ChatStreamHandler;

// Re-export HTTP mocks
pub use crate::http::mock::{MockResponse, MockTransport, RecordedRequest};

// Re-export session mocks
pub use crate::auth::MemorySession;

// Re-export capability mocks
pub use crate::download::mock::RecordingFileSaver;
pub use crate::navigate::mock::RecordingNavigator;

/// Chat stream handler that records every callback
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub tokens: Vec<String>,
    pub done: Vec<ChatSummary>,
    /// Display messages of the delivered errors
    pub errors: Vec<String>,
}

impl RecordingHandler {
    /// Number of terminal callbacks received
    pub fn terminal_count(&self) -> usize {
        self.done.len() + self.errors.len()
    }
}

impl ChatStreamHandler for RecordingHandler {
    fn on_token(&mut self, content: &str) {
        self.tokens.push(content.to_string());
    }

    fn on_done(&mut self, summary: ChatSummary) {
        self.done.push(summary);
    }

    fn on_error(&mut self, error: ApiError) {
        self.errors.push(error.to_string());
    }
}
