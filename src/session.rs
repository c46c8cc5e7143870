//! Session State Publisher
//!
//! Single source of truth for who is logged in. The state lives in a watch
//! channel so late subscribers always see the latest value, and only this
//! module writes the token slot.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info, warn};

use crate::api::{ApiClient, ApiError, MessageResponse};
use crate::auth::{self, DecodeError, TokenStore, UserIdentity};
use crate::forms::{Credentials, Registration, ValidationError};
use crate::navigation::{Navigation, LOGIN_PATH};
use crate::storage::StorageError;

/// Published session snapshot. `is_authenticated` always mirrors whether an
/// identity is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    is_authenticated: bool,
    identity: Option<UserIdentity>,
}

impl SessionState {
    pub fn anonymous() -> Self {
        Self { is_authenticated: false, identity: None }
    }

    pub fn authenticated(identity: UserIdentity) -> Self {
        Self { is_authenticated: true, identity: Some(identity) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }
}

/// Cosmetic identity fields that can change without a new token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayFieldsUpdate {
    pub nombre: Option<String>,
    pub foto_perfil: Option<String>,
}

impl DisplayFieldsUpdate {
    pub fn avatar(path: impl Into<String>) -> Self {
        Self { foto_perfil: Some(path.into()), ..Self::default() }
    }

    pub fn name(nombre: impl Into<String>) -> Self {
        Self { nombre: Some(nombre.into()), ..Self::default() }
    }
}

pub struct SessionPublisher {
    tokens: TokenStore,
    api: Arc<ApiClient>,
    navigation: Arc<Navigation>,
    state: watch::Sender<SessionState>,
    reject_expired: bool,
}

impl SessionPublisher {
    /// Build the publisher and restore any session left in the token slot
    pub fn bootstrap(
        tokens: TokenStore,
        api: Arc<ApiClient>,
        navigation: Arc<Navigation>,
        reject_expired: bool,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::anonymous());
        let publisher = Self { tokens, api, navigation, state, reject_expired };
        publisher.restore();
        publisher
    }

    fn restore(&self) {
        let token = match self.tokens.try_read() {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("No stored session found");
                return;
            }
            Err(e) => {
                warn!("Stored token unreadable ({}), forcing logout", e);
                self.logout();
                return;
            }
        };

        match self.decode(&token) {
            Ok(identity) => {
                info!("Session restored for user: {}", identity.id);
                self.state.send_replace(SessionState::authenticated(identity));
            }
            Err(e) => {
                warn!("Stored token rejected ({}), forcing logout", e);
                self.logout();
            }
        }
    }

    fn decode(&self, token: &str) -> Result<UserIdentity, DecodeError> {
        let decoded = auth::decode_token(token)?;
        if self.reject_expired && decoded.is_expired() {
            return Err(DecodeError::Expired);
        }
        Ok(decoded.identity)
    }

    /// Synchronous snapshot of the current state
    pub fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Stream of states, starting with the current one
    pub fn observe_state(&self) -> WatchStream<SessionState> {
        WatchStream::new(self.state.subscribe())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Log in and publish the new identity. On failure the current state is
    /// left as it was, except when the server hands back a token that cannot
    /// be decoded, which forces a logout.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserIdentity, SessionError> {
        credentials.validate()?;

        let response = self.api.login(credentials).await.map_err(|e| {
            warn!("Login failed: {}", e);
            SessionError::Login(e)
        })?;

        self.tokens.save(&response.token)?;

        match self.decode(&response.token) {
            Ok(identity) => {
                info!("Logged in as user: {}", identity.id);
                self.state.send_replace(SessionState::authenticated(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                error!("Server issued an undecodable token: {}", e);
                self.logout();
                Err(SessionError::Decode(e))
            }
        }
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<MessageResponse, SessionError> {
        registration.validate()?;
        Ok(self.api.register(registration).await?)
    }

    /// Drop the session and send the user to the login page
    pub fn logout(&self) {
        if let Err(e) = self.tokens.clear() {
            error!("Failed to clear stored token: {}", e);
        }
        self.state.send_replace(SessionState::anonymous());
        info!("Logged out");
        self.navigation.navigate_to(LOGIN_PATH);
    }

    /// Patch display fields of the published identity. Returns `false` when
    /// there is no session to patch.
    pub fn refresh_display_fields(&self, update: DisplayFieldsUpdate) -> bool {
        self.state.send_if_modified(|state| {
            let Some(identity) = state.identity.as_mut() else {
                return false;
            };

            let mut changed = false;
            if let Some(nombre) = update.nombre {
                changed |= identity.nombre != nombre;
                identity.nombre = nombre;
            }
            if let Some(foto) = update.foto_perfil {
                changed |= identity.foto_perfil.as_deref() != Some(foto.as_str());
                identity.foto_perfil = Some(foto);
            }
            changed
        });

        self.state.borrow().is_authenticated()
    }
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("login failed: {0}")]
    Login(ApiError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid session token: {0}")]
    Decode(#[from] DecodeError),

    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("cannot read {path}: {reason}")]
    File { path: String, reason: String },
}

impl SessionError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Validation(e) => e.to_string(),
            // Transport failures and rejections look the same to the user
            SessionError::Login(_) => "Invalid credentials. Please try again.".to_string(),
            SessionError::Api(ApiError::Server { message, .. }) => message.clone(),
            SessionError::Api(_) => "Request failed. Please try again.".to_string(),
            SessionError::Decode(_) => "Your session could not be restored. Please log in again.".to_string(),
            SessionError::Storage(_) => "Could not save your session.".to_string(),
            SessionError::File { .. } => self.to_string(),
        }
    }
}
