//! Authentication Module
//!
//! Persisted token slot and the token claims decoder.
//!
//! Decoding is parse-only: the signature is never checked, so the decoded
//! identity is for display. Authorization stays with the backend.

use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "auth_token";

/// Persisted bearer token slot
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Persist the token, replacing any previous one
    pub fn save(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set(TOKEN_KEY, token)?;
        info!("Auth token stored");
        Ok(())
    }

    /// Read the stored token, telling an empty slot apart from one that
    /// exists but cannot be read. Surrounding whitespace is not part of the
    /// token.
    pub fn try_read(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get(TOKEN_KEY)?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    /// Read the stored token, if any
    pub fn read(&self) -> Option<String> {
        self.try_read().unwrap_or_else(|e| {
            debug!("Could not read stored token: {}", e);
            None
        })
    }

    /// Delete the stored token
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(TOKEN_KEY)?;
        info!("Auth token cleared");
        Ok(())
    }
}

/// Identity projected from the token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub nombre: String,
    pub foto_perfil: Option<String>,
}

/// Claims the backend embeds in its tokens
#[derive(Debug, Deserialize)]
struct Claims {
    id: i64,
    nombre: String,
    #[serde(default, alias = "fotoPerfil")]
    foto_perfil: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// A decoded token: the identity plus its optional expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub identity: UserIdentity,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl DecodedToken {
    /// Check if the token carries an `exp` claim in the past
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| chrono::Utc::now() >= exp)
            .unwrap_or(false)
    }
}

/// Decode the identity carried by `token`
pub fn decode(token: &str) -> Result<UserIdentity, DecodeError> {
    decode_token(token).map(|decoded| decoded.identity)
}

/// Decode the token payload without verifying its signature
pub fn decode_token(token: &str) -> Result<DecodedToken, DecodeError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(DecodeError::Structure);
    };

    // Some issuers keep the padding on
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| DecodeError::Encoding(e.to_string()))?;

    let claims: Claims =
        serde_json::from_slice(&bytes).map_err(|e| DecodeError::Claims(e.to_string()))?;

    let expires_at = match claims.exp {
        Some(exp) => Some(
            chrono::DateTime::from_timestamp(exp, 0)
                .ok_or_else(|| DecodeError::Claims(format!("exp out of range: {}", exp)))?,
        ),
        None => None,
    };

    Ok(DecodedToken {
        identity: UserIdentity {
            id: claims.id,
            nombre: claims.nombre,
            foto_perfil: claims.foto_perfil.filter(|p| !p.is_empty()),
        },
        expires_at,
    })
}

/// Token decoding errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is not a three-part JWT")]
    Structure,

    #[error("token payload is not base64url: {0}")]
    Encoding(String),

    #[error("token claims are invalid: {0}")]
    Claims(String),

    #[error("token expired")]
    Expired,
}

#[cfg(test)]
pub(crate) mod testing {
    use base64::{engine::general_purpose, Engine as _};

    /// Build an unsigned token around `payload`
    pub fn token_for(payload: serde_json::Value) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::token_for;
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn decode_reads_backend_claims() {
        let token = token_for(json!({
            "id": 7,
            "email": "ana@example.com",
            "rol": "USER",
            "nombre": "Ana",
            "foto_perfil": "/a.png",
            "sub": "ana@example.com",
            "iat": 1_700_000_000,
            "exp": 1_700_086_400
        }));

        let identity = decode(&token).unwrap();
        assert_eq!(
            identity,
            UserIdentity { id: 7, nombre: "Ana".into(), foto_perfil: Some("/a.png".into()) }
        );
    }

    #[test]
    fn decode_preserves_embedded_id() {
        for id in [0_i64, 1, 42, 9_999_999_999] {
            let token = token_for(json!({ "id": id, "nombre": "X" }));
            assert_eq!(decode(&token).unwrap().id, id);
        }
    }

    #[test]
    fn decode_accepts_camel_case_avatar_and_missing_avatar() {
        let camel = token_for(json!({ "id": 1, "nombre": "Luz", "fotoPerfil": "/l.png" }));
        assert_eq!(decode(&camel).unwrap().foto_perfil.as_deref(), Some("/l.png"));

        let bare = token_for(json!({ "id": 1, "nombre": "Luz" }));
        assert_eq!(decode(&bare).unwrap().foto_perfil, None);

        let null = token_for(json!({ "id": 1, "nombre": "Luz", "foto_perfil": null }));
        assert_eq!(decode(&null).unwrap().foto_perfil, None);
    }

    #[test]
    fn decode_rejects_malformed_tokens() {
        let missing_id = token_for(json!({ "nombre": "Ana" }));
        let missing_name = token_for(json!({ "id": 3 }));

        for bad in [
            "",
            "not-a-token",
            "a.b",
            "a.b.c.d",
            "header.%%%.sig",
            "eyJhbGciOiJIUzI1NiJ9.bm90IGpzb24.sig",
            missing_id.as_str(),
            missing_name.as_str(),
        ] {
            assert!(decode(bad).is_err(), "expected {:?} to fail", bad);
        }
    }

    #[test]
    fn expiry_is_reported_but_not_enforced() {
        let token = token_for(json!({ "id": 1, "nombre": "Ana", "exp": 1 }));
        let decoded = decode_token(&token).unwrap();
        assert!(decoded.is_expired());
        assert!(decode(&token).is_ok());

        let fresh = token_for(json!({ "id": 1, "nombre": "Ana" }));
        assert!(!decode_token(&fresh).unwrap().is_expired());
    }

    #[test]
    fn token_store_reads_trimmed_token() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "  abc.def.ghi\n").unwrap();
        let store = TokenStore::new(storage.clone());

        assert_eq!(store.read().as_deref(), Some("abc.def.ghi"));

        storage.set(TOKEN_KEY, " \n").unwrap();
        assert_eq!(store.try_read().unwrap(), None);
    }

    #[test]
    fn token_store_save_read_clear() {
        let store = TokenStore::new(Arc::new(MemoryStorage::new()));
        assert_eq!(store.read(), None);

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.read().as_deref(), Some("second"));

        store.clear().unwrap();
        assert_eq!(store.read(), None);
        store.clear().unwrap();
    }
}
