//! API Module
//!
//! Typed HTTP client for the account endpoints of the Mamás Perrunas API.
//! Requests are routed through the [`RequestAuthenticator`] before sending.

use serde::{Deserialize, Serialize};
use tracing::{info, debug};

use crate::forms::{Credentials, Registration};
use crate::interceptor::RequestAuthenticator;

/// API client for the Mamás Perrunas backend
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    authenticator: RequestAuthenticator,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `https://host/api`)
    pub fn new(
        base_url: &str,
        authenticator: RequestAuthenticator,
        timeout: std::time::Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            authenticator,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/usuarios{}", self.base_url, path)
    }

    /// Authenticate, send, and map non-2xx statuses to [`ApiError::Server`]
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let request = builder
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let request = self.authenticator.authorize(request);

        debug!("{} {}", request.method(), request.url());

        let response = self.client
            .execute(request)
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        Ok(response)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Exchange credentials for a token
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.url("/login");

        debug!("Logging in at: {}", url);

        let data: LoginResponse = self
            .send_json(self.client.post(&url).json(&LoginRequest {
                email: &credentials.email,
                password: &credentials.password,
            }))
            .await?;

        info!("Login accepted by server");
        Ok(data)
    }

    /// Create a new account
    pub async fn register(&self, registration: &Registration) -> Result<MessageResponse, ApiError> {
        let url = self.url("/registro");

        let data: MessageResponse = self
            .send_json(self.client.post(&url).json(&RegistrationRequest {
                nombre: &registration.nombre,
                email: &registration.email,
                password: &registration.password,
                foto_perfil: Registration::DEFAULT_AVATAR,
            }))
            .await?;

        info!("Account registered for: {}", registration.email);
        Ok(data)
    }

    /// Fetch the profile of the authenticated user
    pub async fn get_profile(&self) -> Result<Profile, ApiError> {
        self.send_json(self.client.get(self.url("/perfil"))).await
    }

    /// Upload a new profile picture; the server resizes and stores it
    pub async fn upload_profile_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<MessageResponse, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(image_mime(file_name))
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("imagen", part);

        info!("Uploading profile image: {}", file_name);

        self.send_json(self.client.post(self.url("/imagen")).multipart(form)).await
    }

    /// Change the display name
    pub async fn update_name(&self, nombre: &str) -> Result<MessageResponse, ApiError> {
        self.send_json(
            self.client
                .put(self.url("/perfil/nombre"))
                .json(&serde_json::json!({ "nombre": nombre })),
        )
        .await
    }

    /// Change the password; the server checks `actual` first
    pub async fn change_password(&self, actual: &str, nueva: &str) -> Result<MessageResponse, ApiError> {
        self.send_json(
            self.client
                .put(self.url("/cambiar-password"))
                .json(&PasswordChangeRequest { actual, nueva }),
        )
        .await
    }

    /// Withdraw the authenticated user from an event
    pub async fn cancel_event_registration(&self, evento_id: i64) -> Result<MessageResponse, ApiError> {
        let url = self.url(&format!("/eventos/{}/cancelar", evento_id));

        let data: MessageResponse = self.send_json(self.client.delete(&url)).await?;

        info!("Event registration cancelled: {}", evento_id);
        Ok(data)
    }
}

fn image_mime(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

// Request/Response types

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequest<'a> {
    nombre: &'a str,
    email: &'a str,
    password: &'a str,
    foto_perfil: &'a str,
}

#[derive(Serialize)]
struct PasswordChangeRequest<'a> {
    actual: &'a str,
    nueva: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Generic `{ "mensaje": ... }` acknowledgement
#[derive(Debug, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub mensaje: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub nombre: String,
    pub email: String,
    #[serde(default)]
    pub foto_perfil: Option<String>,
    #[serde(default)]
    pub posts_creados: Vec<ProfilePost>,
    #[serde(default)]
    pub posts_like: Vec<ProfilePost>,
    #[serde(default)]
    pub posts_favoritos: Vec<ProfilePost>,
    #[serde(default)]
    pub eventos_creados: Vec<ProfileEvent>,
    #[serde(default)]
    pub eventos_inscrito: Vec<ProfileEvent>,
    #[serde(default)]
    pub estadisticas: ProfileStats,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePost {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub favorites: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEvent {
    pub id: i64,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub lugar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    #[serde(default)]
    pub total_posts: i64,
    #[serde(default)]
    pub total_likes: i64,
    #[serde(default)]
    pub total_eventos: i64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Build a server error from a non-2xx response. The backend answers
    /// with either `{"error": ...}` or a bare text body.
    async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| {
                let text = body.trim();
                if text.is_empty() {
                    format!("Status: {}", status)
                } else {
                    text.to_string()
                }
            });

        ApiError::Server { status: status.as_u16(), message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
