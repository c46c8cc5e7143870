//! Profile flows that feed display fields back into the published session.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{ApiClient, MessageResponse, Profile};
use crate::forms::Registration;
use crate::session::{DisplayFieldsUpdate, SessionError, SessionPublisher};

pub struct ProfileService {
    api: Arc<ApiClient>,
    session: Arc<SessionPublisher>,
}

impl ProfileService {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionPublisher>) -> Self {
        Self { api, session }
    }

    pub async fn load(&self) -> Result<Profile, SessionError> {
        Ok(self.api.get_profile().await?)
    }

    /// Upload a new picture, then re-read the profile so the session's avatar
    /// follows the server's stored path. The backend does not reissue tokens
    /// for this.
    pub async fn upload_photo(&self, file: &Path) -> Result<Profile, SessionError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| SessionError::File {
                path: file.display().to_string(),
                reason: e.to_string(),
            })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "perfil.jpg".to_string());

        self.api.upload_profile_image(&file_name, bytes).await?;
        let profile = self.api.get_profile().await?;

        if let Some(foto) = profile.foto_perfil.clone() {
            if !self.session.refresh_display_fields(DisplayFieldsUpdate::avatar(foto)) {
                warn!("Photo uploaded without an active session");
            }
        }

        info!("Profile photo updated");
        Ok(profile)
    }

    pub async fn rename(&self, nombre: &str) -> Result<MessageResponse, SessionError> {
        let nombre = nombre.trim();
        let response = self.api.update_name(nombre).await?;
        self.session.refresh_display_fields(DisplayFieldsUpdate::name(nombre));
        Ok(response)
    }

    pub async fn change_password(&self, actual: &str, nueva: &str) -> Result<MessageResponse, SessionError> {
        Ok(self.api.change_password(actual, nueva).await?)
    }

    pub async fn cancel_event_registration(&self, evento_id: i64) -> Result<MessageResponse, SessionError> {
        Ok(self.api.cancel_event_registration(evento_id).await?)
    }
}

/// Turn a stored avatar path into something displayable
pub fn resolve_avatar(path: Option<&str>, image_base_url: &str) -> String {
    let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
        return Registration::DEFAULT_AVATAR.to_string();
    };

    if path.starts_with("http") || path.contains("assets") {
        return path.to_string();
    }

    let relative = path.trim_start_matches('/');
    let relative = relative.strip_prefix("uploads/").unwrap_or(relative);
    format!("{}{}", image_base_url, relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::token_for;
    use crate::auth::TokenStore;
    use crate::interceptor::RequestAuthenticator;
    use crate::navigation::Navigation;
    use crate::storage::MemoryStorage;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;

    const BASE: &str = "http://localhost:8080/uploads/";

    #[test]
    fn avatar_resolution() {
        assert_eq!(resolve_avatar(None, BASE), "assets/images/default-avatar.png");
        assert_eq!(resolve_avatar(Some("  "), BASE), "assets/images/default-avatar.png");
        assert_eq!(
            resolve_avatar(Some("https://cdn.example.com/a.png"), BASE),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(
            resolve_avatar(Some("assets/images/default-avatar.png"), BASE),
            "assets/images/default-avatar.png"
        );
        assert_eq!(
            resolve_avatar(Some("/uploads/perfiles/perfil_7.jpg"), BASE),
            "http://localhost:8080/uploads/perfiles/perfil_7.jpg"
        );
        assert_eq!(
            resolve_avatar(Some("perfiles/perfil_7.jpg"), BASE),
            "http://localhost:8080/uploads/perfiles/perfil_7.jpg"
        );
    }

    fn service(url: &str, token: Option<&str>) -> (ProfileService, Arc<SessionPublisher>) {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        if let Some(token) = token {
            tokens.save(token).unwrap();
        }
        let api = Arc::new(
            ApiClient::new(url, RequestAuthenticator::new(tokens.clone()), Duration::from_secs(5))
                .unwrap(),
        );
        let session = Arc::new(SessionPublisher::bootstrap(
            tokens,
            api.clone(),
            Arc::new(Navigation::new()),
            false,
        ));
        (ProfileService::new(api, session.clone()), session)
    }

    #[tokio::test]
    async fn upload_photo_patches_published_avatar() {
        let token = token_for(json!({ "id": 7, "nombre": "Ana", "foto_perfil": "/a.png" }));
        let mut server = Server::new_async().await;
        let upload = server
            .mock("POST", "/api/usuarios/imagen")
            .match_header("authorization", format!("Bearer {}", token).as_str())
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .with_status(200)
            .with_body(r#"{"mensaje":"Imagen actualizada"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/usuarios/perfil")
            .with_status(200)
            .with_body(
                json!({
                    "nombre": "Ana",
                    "email": "ana@example.com",
                    "fotoPerfil": "/uploads/perfiles/perfil_7_1.jpg"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"\xff\xd8\xff\xe0 fake jpeg").unwrap();

        let (profiles, session) = service(&format!("{}/api", server.url()), Some(&token));
        profiles.upload_photo(file.path()).await.unwrap();

        upload.assert_async().await;
        let state = session.current_state();
        let identity = state.identity().unwrap();
        assert_eq!(identity.foto_perfil.as_deref(), Some("/uploads/perfiles/perfil_7_1.jpg"));
        assert_eq!(identity.id, 7);
        assert_eq!(identity.nombre, "Ana");
    }

    #[tokio::test]
    async fn rename_patches_published_name() {
        let token = token_for(json!({ "id": 7, "nombre": "Ana" }));
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/api/usuarios/perfil/nombre")
            .match_body(Matcher::Json(json!({ "nombre": "Ana María" })))
            .with_status(200)
            .with_body(r#"{"mensaje":"Nombre actualizado correctamente"}"#)
            .create_async()
            .await;

        let (profiles, session) = service(&format!("{}/api", server.url()), Some(&token));
        let response = profiles.rename("  Ana María ").await.unwrap();

        assert_eq!(response.mensaje.as_deref(), Some("Nombre actualizado correctamente"));
        assert_eq!(session.current_state().identity().unwrap().nombre, "Ana María");
    }

    #[tokio::test]
    async fn failed_password_change_surfaces_server_message() {
        let mut server = Server::new_async().await;
        server
            .mock("PUT", "/api/usuarios/cambiar-password")
            .with_status(400)
            .with_body(r#"{"error":"La contraseña actual no es correcta"}"#)
            .create_async()
            .await;

        let (profiles, _) = service(&format!("{}/api", server.url()), None);
        let err = profiles.change_password("vieja", "Nueva123").await.unwrap_err();

        assert_eq!(err.user_message(), "La contraseña actual no es correcta");
    }
}
