//! Commands Module
//!
//! User-facing operations. Each returns a serializable result the caller can
//! print or hand to a UI.

use std::path::Path;

use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::{info, error, debug};

use crate::api::Profile;
use crate::forms::{Credentials, Registration};
use crate::navigation::{HOME_PATH, LOGIN_PATH};
use crate::profile::resolve_avatar;
use crate::session::SessionState;
use crate::AppState;

// Response types

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub is_authenticated: bool,
    pub user_id: Option<i64>,
    pub nombre: Option<String>,
    pub avatar_url: Option<String>,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub success: bool,
    pub user_id: Option<i64>,
    pub nombre: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResult {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl MessageResult {
    fn ok(message: Option<String>) -> Self {
        Self { success: true, message, error: None }
    }

    fn failed(error: String) -> Self {
        Self { success: false, message: None, error: Some(error) }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct NavigationResult {
    pub requested: String,
    pub location: String,
}

fn session_response(state: &AppState, session: &SessionState) -> SessionResponse {
    let identity = session.identity();
    SessionResponse {
        is_authenticated: session.is_authenticated(),
        user_id: identity.map(|i| i.id),
        nombre: identity.map(|i| i.nombre.clone()),
        avatar_url: identity.map(|i| {
            resolve_avatar(i.foto_perfil.as_deref(), &state.config.image_base_url)
        }),
        location: state.navigation.current(),
    }
}

// Commands

/// Current session as restored from storage
pub fn get_session(state: &AppState) -> SessionResponse {
    debug!("Getting session");
    session_response(state, &state.session.current_state())
}

/// Log in and go to the home page
pub async fn login(state: &AppState, email: &str, password: &str) -> LoginResult {
    match state.session.login(&Credentials::new(email, password)).await {
        Ok(identity) => {
            state.router.open(HOME_PATH);
            LoginResult {
                success: true,
                user_id: Some(identity.id),
                nombre: Some(identity.nombre),
                error: None,
            }
        }
        Err(e) => {
            error!("Login failed: {}", e);
            LoginResult {
                success: false,
                user_id: None,
                nombre: None,
                error: Some(e.user_message()),
            }
        }
    }
}

/// Create an account, then point the user at the login page
pub async fn register(state: &AppState, nombre: &str, email: &str, password: &str) -> MessageResult {
    match state.session.register(&Registration::new(nombre, email, password)).await {
        Ok(response) => {
            state.router.open(LOGIN_PATH);
            MessageResult::ok(response.mensaje.or_else(|| Some("Registration successful".into())))
        }
        Err(e) => {
            error!("Registration failed: {}", e);
            MessageResult::failed(e.user_message())
        }
    }
}

pub fn logout(state: &AppState) -> SessionResponse {
    info!("Logging out");
    state.session.logout();
    get_session(state)
}

/// Enter a guarded page or explain why not
fn enter_guarded(state: &AppState, path: &str) -> Result<(), String> {
    if state.router.open(path) == path {
        Ok(())
    } else {
        Err("Please log in first".to_string())
    }
}

pub async fn get_profile(state: &AppState) -> Result<ProfileResponse, String> {
    enter_guarded(state, "/perfil")?;

    let profile = state.profiles.load().await.map_err(|e| e.user_message())?;
    let avatar_url = resolve_avatar(profile.foto_perfil.as_deref(), &state.config.image_base_url);
    Ok(ProfileResponse { profile, avatar_url })
}

pub async fn upload_photo(state: &AppState, file: &Path) -> Result<SessionResponse, String> {
    enter_guarded(state, "/perfil")?;

    state.profiles.upload_photo(file).await.map_err(|e| {
        error!("Photo upload failed: {}", e);
        e.user_message()
    })?;
    Ok(get_session(state))
}

pub async fn rename(state: &AppState, nombre: &str) -> MessageResult {
    if let Err(e) = enter_guarded(state, "/perfil") {
        return MessageResult::failed(e);
    }

    match state.profiles.rename(nombre).await {
        Ok(response) => MessageResult::ok(response.mensaje),
        Err(e) => MessageResult::failed(e.user_message()),
    }
}

pub async fn change_password(state: &AppState, actual: &str, nueva: &str) -> MessageResult {
    if let Err(e) = enter_guarded(state, "/perfil") {
        return MessageResult::failed(e);
    }

    match state.profiles.change_password(actual, nueva).await {
        Ok(response) => MessageResult::ok(response.mensaje),
        Err(e) => MessageResult::failed(e.user_message()),
    }
}

pub async fn cancel_event(state: &AppState, evento_id: i64) -> MessageResult {
    if let Err(e) = enter_guarded(state, "/perfil") {
        return MessageResult::failed(e);
    }

    match state.profiles.cancel_event_registration(evento_id).await {
        Ok(response) => MessageResult::ok(response.mensaje),
        Err(e) => MessageResult::failed(e.user_message()),
    }
}

pub fn open_route(state: &AppState, path: &str) -> NavigationResult {
    NavigationResult {
        requested: path.to_string(),
        location: state.router.open(path),
    }
}

/// Log every session change, the way a navbar would re-render on them
pub fn spawn_session_logger(state: &AppState) -> tokio::task::JoinHandle<()> {
    let mut states = state.session.observe_state();

    tokio::spawn(async move {
        while let Some(session) = states.next().await {
            match session.identity() {
                Some(identity) => debug!("Session: user {} ({})", identity.id, identity.nombre),
                None => debug!("Session: anonymous"),
            }
        }
    })
}
