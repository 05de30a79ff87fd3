//! Navigation to front-end routes
//!
//! The client only ever navigates on a terminal authentication failure, to send
//! the user back to the login screen.

use anyhow::Context;

use crate::request::build_url;

/// Trait for moving the user to another front-end route
///
/// This abstraction allows easy mocking of navigation in tests.
pub trait Navigator: Send + Sync {
    /// Sends the user to `route` (for example `/login`)
    fn redirect(&self, route: &str) -> anyhow::Result<()>;
}

/// Opens front-end routes in the system browser
#[derive(Debug, Clone)]
pub struct BrowserNavigator {
    app_base_url: String,
}

impl BrowserNavigator {
    pub fn new(app_base_url: impl Into<String>) -> Self {
        Self {
            app_base_url: app_base_url.into(),
        }
    }

    /// Absolute URL for a route of the front end
    pub fn route_url(&self, route: &str) -> String {
        build_url(&self.app_base_url, route)
    }
}

impl Navigator for BrowserNavigator {
    fn redirect(&self, route: &str) -> anyhow::Result<()> {
        let url = self.route_url(route);
        tracing::info!(%url, "Redirecting to front-end route");
        open::that(&url).with_context(|| format!("Failed to open {url}"))
    }
}
