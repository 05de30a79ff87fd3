//! Common test utilities for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use vidchat_client::auth::CookieSession;
use vidchat_client::download::DirectorySaver;
use vidchat_client::navigate::Navigator;
use vidchat_client::{ApiClient, ClientConfig, ReqwestTransport};

/// Navigator that remembers every route it was asked to open
#[derive(Debug, Default)]
pub struct Redirects(Mutex<Vec<String>>);

impl Redirects {
    pub fn routes(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Navigator for Redirects {
    fn redirect(&self, route: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(route.to_string());
        Ok(())
    }
}

/// A real reqwest-backed client pointed at a mock server
pub struct TestClient {
    pub client: ApiClient,
    pub cookies: Arc<CookieSession>,
    pub redirects: Arc<Redirects>,
    pub downloads: TempDir,
}

/// Builds a client whose API lives under `{server_url}/api`
pub fn client_for(server_url: &str) -> TestClient {
    let config = ClientConfig {
        api_base_url: format!("{server_url}/api"),
        ..ClientConfig::default()
    };
    let cookies = Arc::new(CookieSession::new());
    let redirects = Arc::new(Redirects::default());
    let downloads = TempDir::new().expect("Failed to create temp dir");

    let transport =
        ReqwestTransport::new(cookies.clone(), None).expect("Failed to create transport");
    let client = ApiClient::with_parts(
        &config,
        transport,
        cookies.clone(),
        redirects.clone(),
        Arc::new(DirectorySaver::new(downloads.path())),
    );

    TestClient {
        client,
        cookies,
        redirects,
        downloads,
    }
}

/// One SSE frame as the backend writes it
pub fn sse(payload: &str) -> String {
    format!("data: {payload}\n\n")
}
