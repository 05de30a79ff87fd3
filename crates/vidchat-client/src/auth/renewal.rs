//! Session renewal on HTTP 401
//!
//! Each logical request may trigger at most one refresh. Refreshes started by
//! concurrent requests are coalesced into a single in-flight call.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::error::{http_error, ApiError};
use crate::http::{HttpResponse, HttpTransport};
use crate::request::RequestDescriptor;

pub const REFRESH_ENDPOINT: &str = "/auth/refresh/";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout/";

/// Where a sent request landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Ok,
    /// 401 on the first attempt; a refresh may recover it
    UnauthorizedFirst,
    /// 401 after the request was already retried once
    UnauthorizedRetried,
    OtherError,
}

impl AuthState {
    /// Classifies a response status for a request with the given retry history
    pub fn classify(status: u16, retry_count: u32, auth_retry: bool) -> Self {
        match status {
            200..=299 => Self::Ok,
            401 if !auth_retry => Self::OtherError,
            401 if retry_count == 0 => Self::UnauthorizedFirst,
            401 => Self::UnauthorizedRetried,
            _ => Self::OtherError,
        }
    }
}

/// Why a refresh did not renew the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    Rejected(u16),
    Network(String),
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(status) => write!(f, "refresh rejected with status {status}"),
            Self::Network(message) => write!(f, "refresh request failed: {message}"),
        }
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Result<(), RefreshError>>>;

/// Holds the refresh currently in flight, if any
#[derive(Clone, Default)]
pub(crate) struct RefreshGuard {
    inflight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshGuard {
    /// Joins the in-flight refresh or starts a new one with `start`
    pub(crate) async fn run<F>(&self, start: F) -> Result<(), RefreshError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<(), RefreshError>>,
    {
        let refresh = {
            let mut slot = self.inflight.lock().await;
            if let Some(refresh) = slot.as_ref() {
                tracing::debug!("Joining in-flight session refresh");
                refresh.clone()
            } else {
                let inflight = self.inflight.clone();
                let attempt = start();
                let refresh = async move {
                    let outcome = attempt.await;
                    *inflight.lock().await = None;
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some(refresh.clone());
                refresh
            }
        };

        refresh.await
    }
}

impl<T: HttpTransport> ApiClient<T> {
    /// Sends a request under the refresh-once policy
    ///
    /// Returns the successful response with its body unread. A second 401 or a
    /// failed refresh signs the user out and yields [`ApiError::AuthFailed`].
    pub(crate) async fn send_with_renewal(
        &self,
        mut request: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        loop {
            let response = self.send_once(&request, cancel).await?;

            match AuthState::classify(response.status, request.retry_count, request.auth_retry) {
                AuthState::Ok => return Ok(response),
                AuthState::OtherError => return Err(http_error(response).await),
                AuthState::UnauthorizedRetried => {
                    tracing::warn!(
                        endpoint = %request.endpoint,
                        "Still unauthorized after session refresh"
                    );
                    return Err(self.auth_failure().await);
                }
                AuthState::UnauthorizedFirst => {
                    tracing::info!(
                        endpoint = %request.endpoint,
                        "Session expired, attempting refresh..."
                    );
                    let refreshed = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(ApiError::Cancelled),
                        outcome = self.refresh_session() => outcome,
                    };

                    match refreshed {
                        Ok(()) => {
                            tracing::info!("Session refreshed successfully");
                            request.retry_count += 1;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Session refresh failed");
                            return Err(self.auth_failure().await);
                        }
                    }
                }
            }
        }
    }

    /// Renews the session, sharing one refresh call among concurrent callers
    pub(crate) async fn refresh_session(&self) -> Result<(), RefreshError> {
        let transport = self.transport.clone();
        let request = RequestDescriptor::post(REFRESH_ENDPOINT)
            .without_auth_retry()
            .build(&self.base_url);

        self.refresh
            .run(move || {
                async move {
                    let request = request.map_err(|e| RefreshError::Network(e.to_string()))?;
                    match transport.send(&request).await {
                        Ok(response) if response.is_success() => Ok(()),
                        Ok(response) => Err(RefreshError::Rejected(response.status)),
                        Err(e) => Err(RefreshError::Network(format!("{e:#}"))),
                    }
                }
                .boxed()
            })
            .await
    }

    /// Terminal authentication failure: sign out, send the user to login
    async fn auth_failure(&self) -> ApiError {
        self.clear_session().await;

        if let Err(e) = self.navigator.redirect(&self.login_route) {
            tracing::warn!(error = %e, "Failed to redirect to login");
        }

        ApiError::AuthFailed
    }

    /// Best-effort sign-out; failures are logged and swallowed
    pub(crate) async fn clear_session(&self) {
        match RequestDescriptor::post(LOGOUT_ENDPOINT)
            .without_auth_retry()
            .build(&self.base_url)
        {
            Ok(request) => match self.transport.send(&request).await {
                Ok(response) if !response.is_success() => {
                    tracing::debug!(status = response.status, "Logout request rejected");
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Logout request failed"),
            },
            Err(e) => tracing::debug!(error = %e, "Failed to build logout request"),
        }

        if let Err(e) = self.session.clear().await {
            tracing::warn!(error = %e, "Failed to clear session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    const VIDEOS: &str = "http://api.test/videos/";
    const REFRESH: &str = "http://api.test/auth/refresh/";
    const LOGOUT: &str = "http://api.test/auth/logout/";

    #[test]
    fn classify_states() {
        assert_eq!(AuthState::classify(200, 0, true), AuthState::Ok);
        assert_eq!(AuthState::classify(204, 1, true), AuthState::Ok);
        assert_eq!(AuthState::classify(401, 0, true), AuthState::UnauthorizedFirst);
        assert_eq!(AuthState::classify(401, 1, true), AuthState::UnauthorizedRetried);
        assert_eq!(AuthState::classify(401, 0, false), AuthState::OtherError);
        assert_eq!(AuthState::classify(403, 0, true), AuthState::OtherError);
        assert_eq!(AuthState::classify(500, 0, true), AuthState::OtherError);
    }

    #[tokio::test]
    async fn single_401_is_recovered_transparently() {
        let transport = MockTransport::new()
            .on(Method::GET, VIDEOS, MockResponse::new(401))
            .on_json(Method::GET, VIDEOS, 200, &json!([]))
            .on(Method::POST, REFRESH, MockResponse::new(200));
        let harness = Harness::new(transport);

        let response = harness.client.execute(RequestDescriptor::get("/videos/")).await.unwrap();

        assert!(response.is_success());
        assert_eq!(harness.transport.count_for(VIDEOS), 2);
        assert_eq!(harness.transport.count_for(REFRESH), 1);
        assert_eq!(harness.navigator.redirect_count(), 0);
        assert_eq!(harness.session.clear_count(), 0);
    }

    #[tokio::test]
    async fn retry_is_sent_after_refresh() {
        let transport = MockTransport::new()
            .on(Method::GET, VIDEOS, MockResponse::new(401))
            .on_json(Method::GET, VIDEOS, 200, &json!([]))
            .on(Method::POST, REFRESH, MockResponse::new(200));
        let harness = Harness::new(transport);

        harness.client.execute(RequestDescriptor::get("/videos/")).await.unwrap();

        let urls: Vec<String> = harness
            .transport
            .get_requests()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(urls, [VIDEOS, REFRESH, VIDEOS]);
    }

    #[tokio::test]
    async fn second_401_is_terminal() {
        let transport = MockTransport::new()
            .on(Method::GET, VIDEOS, MockResponse::new(401))
            .on(Method::POST, REFRESH, MockResponse::new(200))
            .on(Method::POST, LOGOUT, MockResponse::new(200));
        let harness = Harness::new(transport);

        let err = harness
            .client
            .execute(RequestDescriptor::get("/videos/"))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(harness.transport.count_for(VIDEOS), 2);
        assert_eq!(harness.transport.count_for(REFRESH), 1);
        assert_eq!(harness.navigator.redirects(), vec!["/login".to_string()]);
        assert_eq!(harness.session.clear_count(), 1);
    }

    #[tokio::test]
    async fn refresh_failure_goes_to_auth_failure() {
        let transport = MockTransport::new()
            .on(Method::GET, VIDEOS, MockResponse::new(401))
            .on(Method::POST, REFRESH, MockResponse::new(401))
            .on(Method::POST, LOGOUT, MockResponse::new(200));
        let harness = Harness::new(transport);

        let err = harness
            .client
            .execute(RequestDescriptor::get("/videos/"))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(harness.transport.count_for(VIDEOS), 1);
        assert_eq!(harness.navigator.redirect_count(), 1);
    }

    #[tokio::test]
    async fn failing_session_clear_is_swallowed() {
        let transport = MockTransport::new()
            .on(Method::GET, VIDEOS, MockResponse::new(401))
            .on_reject(Method::POST, REFRESH, "connection refused")
            .on_reject(Method::POST, LOGOUT, "connection refused");
        let harness = Harness::with_session(transport, MemorySession::failing());

        let err = harness
            .client
            .execute(RequestDescriptor::get("/videos/"))
            .await
            .unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(harness.session.clear_count(), 1);
        assert_eq!(harness.navigator.redirect_count(), 1);
    }

    #[tokio::test]
    async fn auth_endpoints_never_refresh() {
        let login = "http://api.test/auth/login/";
        let transport = MockTransport::new().on_json(
            Method::POST,
            login,
            401,
            &json!({"detail": "No active account found with the given credentials"}),
        );
        let harness = Harness::new(transport);

        let err = harness
            .client
            .execute(RequestDescriptor::post("/auth/login/").without_auth_retry())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.to_string(),
            "No active account found with the given credentials"
        );
        assert_eq!(harness.transport.count_for(REFRESH), 0);
        assert_eq!(harness.navigator.redirect_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_refresh() {
        let groups = "http://api.test/videos/groups/";
        let transport = MockTransport::new()
            .on(Method::GET, VIDEOS, MockResponse::new(401))
            .on_json(Method::GET, VIDEOS, 200, &json!([]))
            .on(Method::GET, groups, MockResponse::new(401))
            .on_json(Method::GET, groups, 200, &json!([]))
            .on(
                Method::POST,
                REFRESH,
                MockResponse::new(200).delay(Duration::from_millis(50)),
            );
        let harness = Harness::new(transport);

        let (videos, grouped) = tokio::join!(
            harness.client.execute(RequestDescriptor::get("/videos/")),
            harness.client.execute(RequestDescriptor::get("/videos/groups/")),
        );

        assert!(videos.unwrap().is_success());
        assert!(grouped.unwrap().is_success());
        assert_eq!(harness.transport.count_for(REFRESH), 1);
    }

    #[tokio::test]
    async fn later_refreshes_start_fresh() {
        let transport = MockTransport::new().on(Method::POST, REFRESH, MockResponse::new(200));
        let harness = Harness::new(transport);

        harness.client.refresh_session().await.unwrap();
        harness.client.refresh_session().await.unwrap();

        assert_eq!(harness.transport.count_for(REFRESH), 2);
    }

    #[tokio::test]
    async fn cancelled_request_is_not_sent_further() {
        let transport = MockTransport::new().on(
            Method::GET,
            VIDEOS,
            MockResponse::new(200).delay(Duration::from_secs(30)),
        );
        let harness = Harness::new(transport);
        let cancel = harness.client.cancellation_token();
        cancel.cancel();

        let err = harness
            .client
            .execute_with_cancel(RequestDescriptor::get("/videos/"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Cancelled));
    }
}
