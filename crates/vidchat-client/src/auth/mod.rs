mod renewal;
mod session;

pub use renewal::{AuthState, RefreshError, LOGOUT_ENDPOINT, REFRESH_ENDPOINT};
pub(crate) use renewal::RefreshGuard;
pub use session::{CookieSession, SessionStore};

#[cfg(test)]
pub use session::mock::MemorySession;
