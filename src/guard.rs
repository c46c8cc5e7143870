//! Route Guard
//!
//! Binary authenticated/anonymous check for protected routes.

use std::sync::Arc;

use tracing::info;

use crate::navigation::{Navigation, LOGIN_PATH};
use crate::session::SessionPublisher;

pub struct RouteGuard {
    session: Arc<SessionPublisher>,
    navigation: Arc<Navigation>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionPublisher>, navigation: Arc<Navigation>) -> Self {
        Self { session, navigation }
    }

    /// Allow navigation when a session exists; otherwise redirect to the
    /// login page and deny.
    pub fn can_activate(&self) -> bool {
        if self.session.current_state().is_authenticated() {
            return true;
        }

        info!("Guarded route requested without a session, redirecting to login");
        self.navigation.navigate_to(LOGIN_PATH);
        false
    }
}
