use serde::Deserialize;
use serde_json::json;

use super::types::User;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpTransport;
use crate::request::RequestDescriptor;

const LOGIN_ENDPOINT: &str = "/auth/login/";
const SIGNUP_ENDPOINT: &str = "/auth/signup/";
const ME_ENDPOINT: &str = "/auth/me/";

/// Auth endpoints answer with the user either bare or wrapped in `{"user": ...}`
#[derive(Deserialize)]
#[serde(untagged)]
enum UserPayload {
    Wrapped { user: User },
    Plain(User),
}

impl From<UserPayload> for User {
    fn from(payload: UserPayload) -> Self {
        match payload {
            UserPayload::Wrapped { user } | UserPayload::Plain(user) => user,
        }
    }
}

impl<T: HttpTransport> ApiClient<T> {
    /// Signs in; the session cookie is stored by the transport
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let request = RequestDescriptor::post(LOGIN_ENDPOINT)
            .without_auth_retry()
            .json(&json!({ "username": username, "password": password }))?;

        let user: UserPayload = self.request_json(request).await?;
        let user = User::from(user);
        tracing::info!(username = %user.username, "Logged in");
        Ok(user)
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let request = RequestDescriptor::post(SIGNUP_ENDPOINT)
            .without_auth_retry()
            .json(&json!({ "username": username, "email": email, "password": password }))?;

        let user: UserPayload = self.request_json(request).await?;
        Ok(user.into())
    }

    /// Signs out; never fails, the local session is cleared regardless
    pub async fn logout(&self) {
        self.clear_session().await;
        tracing::info!("Logged out");
    }

    /// The signed-in user
    pub async fn me(&self) -> Result<User, ApiError> {
        let user: UserPayload = self
            .request_json(RequestDescriptor::get(ME_ENDPOINT).without_auth_retry())
            .await?;
        Ok(user.into())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.me().await.is_ok()
    }
}
