use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::auth::{CookieSession, RefreshGuard, SessionStore};
use crate::config::ClientConfig;
use crate::decode::{decode_into, decode_json};
use crate::download::{DirectorySaver, FileSaver};
use crate::error::ApiError;
use crate::http::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::navigate::{BrowserNavigator, Navigator};
use crate::request::RequestDescriptor;

/// Gateway client for the video chat backend
///
/// Generic over the transport implementation for testability. Clones share the
/// transport, the session, the in-flight refresh and the cancellation root.
pub struct ApiClient<T: HttpTransport = ReqwestTransport> {
    pub(crate) transport: Arc<T>,
    pub(crate) base_url: String,
    pub(crate) login_route: String,
    pub(crate) session: Arc<dyn SessionStore>,
    pub(crate) navigator: Arc<dyn Navigator>,
    pub(crate) saver: Arc<dyn FileSaver>,
    pub(crate) refresh: RefreshGuard,
    cancel: CancellationToken,
}

impl ApiClient<ReqwestTransport> {
    /// Creates a client with the reqwest transport, an in-memory cookie jar,
    /// the system browser for navigation and a directory saver for downloads
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let session = Arc::new(CookieSession::new());
        let transport = ReqwestTransport::new(session.clone(), config.request_timeout())?;
        let saver = match &config.download_dir {
            Some(dir) => DirectorySaver::new(dir),
            None => DirectorySaver::downloads()?,
        };

        Ok(Self::with_parts(
            config,
            transport,
            session,
            Arc::new(BrowserNavigator::new(&config.app_base_url)),
            Arc::new(saver),
        ))
    }
}

impl<T: HttpTransport> ApiClient<T> {
    /// Creates a client from explicit capabilities
    pub fn with_parts(
        config: &ClientConfig,
        transport: T,
        session: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        saver: Arc<dyn FileSaver>,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            base_url: config.api_base_url.clone(),
            login_route: config.login_route.clone(),
            session,
            navigator,
            saver,
            refresh: RefreshGuard::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A token that is cancelled by [`ApiClient::shutdown`] or by cancelling it directly
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Cancels every request and stream in flight on this client and its clones
    pub fn shutdown(&self) {
        tracing::debug!("Cancelling all in-flight requests");
        self.cancel.cancel();
    }

    /// Sends a request under the refresh-once policy
    ///
    /// Returns the successful response with its body unread.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<HttpResponse, ApiError> {
        self.execute_with_cancel(request, &self.cancel).await
    }

    /// Same as [`ApiClient::execute`], cancelled by `cancel` as well
    pub async fn execute_with_cancel(
        &self,
        request: RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        let method = request.method.clone();
        let endpoint = request.endpoint.clone();

        let result = self.send_with_renewal(request, cancel).await;
        match &result {
            Err(ApiError::Cancelled) => {
                tracing::debug!(%method, %endpoint, "API request cancelled");
            }
            Err(e) => {
                tracing::error!(%method, %endpoint, status = e.status(), error = %e, "API request failed");
            }
            Ok(_) => {}
        }
        result
    }

    /// Sends one attempt of a request; no renewal
    pub(crate) async fn send_once(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        let http_request = request.build(&self.base_url)?;
        tracing::debug!(
            method = %http_request.method,
            url = %http_request.url,
            retry = request.retry_count,
            "Sending request"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ApiError::Cancelled),
            sent = self.transport.send(&http_request) => sent.map_err(|e| ApiError::network(&e)),
        }
    }

    /// Executes a request and decodes the payload, `{}` when there is none
    pub async fn request_value(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        let response = self.execute(request).await?;
        decode_json(response).await
    }

    /// Executes a request and deserializes the payload
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<R, ApiError> {
        decode_into(self.request_value(request).await?)
    }

    /// Executes a request whose payload carries nothing of interest
    pub async fn request_empty(&self, request: RequestDescriptor) -> Result<(), ApiError> {
        self.request_value(request).await.map(drop)
    }
}

impl<T: HttpTransport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            base_url: self.base_url.clone(),
            login_route: self.login_route.clone(),
            session: self.session.clone(),
            navigator: self.navigator.clone(),
            saver: self.saver.clone(),
            refresh: self.refresh.clone(),
            cancel: self.cancel.clone(),
        }
    }
}
