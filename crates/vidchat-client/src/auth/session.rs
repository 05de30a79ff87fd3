use anyhow::Result;
use async_trait::async_trait;
use cookie_store::RawCookie;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest::Url;
use std::sync::{PoisonError, RwLock};

/// Trait for the store holding the session credential
///
/// The client never reads credential values; it only asks the store to forget
/// them when the session cannot be renewed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Forgets every credential held for the backend
    async fn clear(&self) -> Result<()>;

    /// Checks whether any credential is currently held
    async fn has_session(&self) -> bool;
}

/// In-memory cookie jar shared with the HTTP transport
///
/// Storage and matching follow RFC 6265 (domain, path, `Secure`, expiry).
/// Values are written exclusively from `Set-Cookie` response headers.
#[derive(Debug, Default)]
pub struct CookieSession {
    jar: RwLock<cookie_store::CookieStore>,
}

impl CookieSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired cookies currently held
    pub fn len(&self) -> usize {
        self.jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_unexpired()
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for CookieSession {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies = cookie_headers.filter_map(|header| {
            let parsed = header
                .to_str()
                .ok()
                .and_then(|raw| RawCookie::parse(raw.to_owned()).ok());
            if parsed.is_none() {
                tracing::debug!("Ignoring malformed Set-Cookie header");
            }
            parsed
        });

        self.jar
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .store_response_cookies(cookies, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .jar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

#[async_trait]
impl SessionStore for CookieSession {
    async fn clear(&self) -> Result<()> {
        self.jar
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    async fn has_session(&self) -> bool {
        !self.is_empty()
    }
}
