//! Mamás Perrunas Session Library
//!
//! Session state, route protection and account endpoints for the
//! Mamás Perrunas community platform.

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod forms;
pub mod guard;
pub mod interceptor;
pub mod logging;
pub mod navigation;
pub mod profile;
pub mod routes;
pub mod session;
pub mod storage;

use std::sync::Arc;

use api::{ApiClient, ApiError};
use auth::TokenStore;
use config::Config;
use guard::RouteGuard;
use interceptor::RequestAuthenticator;
use navigation::Navigation;
use profile::ProfileService;
use routes::Router;
use session::SessionPublisher;
use storage::{KeyValueStore, SecureStorage};

/// Application-scoped services, built once at startup
pub struct AppState {
    pub config: Config,
    pub navigation: Arc<Navigation>,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionPublisher>,
    pub profiles: ProfileService,
    pub router: Router,
}

impl AppState {
    /// Build the app over the on-disk storage in `config.data_dir`
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let storage = Arc::new(SecureStorage::new(&config.data_dir));
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let tokens = TokenStore::new(storage);
        let navigation = Arc::new(Navigation::new());

        let api = Arc::new(ApiClient::new(
            &config.api_base_url,
            RequestAuthenticator::new(tokens.clone()),
            config.http_timeout,
        )?);

        let session = Arc::new(SessionPublisher::bootstrap(
            tokens,
            api.clone(),
            navigation.clone(),
            config.reject_expired_tokens,
        ));

        let profiles = ProfileService::new(api.clone(), session.clone());
        let router = Router::new(
            RouteGuard::new(session.clone(), navigation.clone()),
            navigation.clone(),
        );

        Ok(Self { config, navigation, api, session, profiles, router })
    }
}
