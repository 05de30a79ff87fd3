//! A client wired to recording doubles

use std::sync::Arc;

use super::mocks::*;
use crate::client::ApiClient;
use crate::config::ClientConfig;

pub const TEST_BASE_URL: &str = "http://api.test";

/// Client plus handles on every double it talks to
pub struct Harness {
    pub client: ApiClient<MockTransport>,
    pub transport: MockTransport,
    pub session: MemorySession,
    pub navigator: RecordingNavigator,
    pub saver: RecordingFileSaver,
}

impl Harness {
    pub fn new(transport: MockTransport) -> Self {
        Self::with_session(transport, MemorySession::new())
    }

    pub fn with_session(transport: MockTransport, session: MemorySession) -> Self {
        let config = ClientConfig {
            api_base_url: TEST_BASE_URL.to_string(),
            ..ClientConfig::default()
        };
        let navigator = RecordingNavigator::new();
        let saver = RecordingFileSaver::new();
        let client = ApiClient::with_parts(
            &config,
            transport.clone(),
            Arc::new(session.clone()),
            Arc::new(navigator.clone()),
            Arc::new(saver.clone()),
        );

        Self {
            client,
            transport,
            session,
            navigator,
            saver,
        }
    }
}
