//! Current client location.
//!
//! Redirects (logout, guard denial) are written here; anything rendering the
//! app follows it through [`Navigation::subscribe`].

use tokio::sync::watch;
use tracing::debug;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

pub struct Navigation {
    location: watch::Sender<String>,
}

impl Navigation {
    pub fn new() -> Self {
        Self::starting_at(HOME_PATH)
    }

    pub fn starting_at(path: &str) -> Self {
        let (location, _) = watch::channel(path.to_string());
        Self { location }
    }

    pub fn current(&self) -> String {
        self.location.borrow().clone()
    }

    /// Move to `path` unconditionally
    pub fn navigate_to(&self, path: &str) {
        debug!("Navigating to {}", path);
        self.location.send_replace(path.to_string());
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new()
    }
}
