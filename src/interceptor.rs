//! Request Authenticator
//!
//! Every outgoing request passes through here before it is sent.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use tracing::{trace, warn};

use crate::auth::TokenStore;

/// Attaches the stored bearer token to outgoing requests
#[derive(Clone)]
pub struct RequestAuthenticator {
    tokens: TokenStore,
}

impl RequestAuthenticator {
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }

    /// Return `request` with `Authorization: Bearer <token>` set when a token
    /// is stored, otherwise unchanged.
    pub fn authorize(&self, mut request: Request) -> Request {
        let Some(token) = self.tokens.read() else {
            return request;
        };

        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
                trace!("Bearer token attached to {} {}", request.method(), request.url().path());
            }
            Err(_) => warn!("Stored token is not a valid header value; sending unauthenticated"),
        }

        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStorage};
    use std::sync::Arc;

    fn request() -> Request {
        reqwest::Client::new()
            .get("http://localhost/api/usuarios/perfil")
            .build()
            .unwrap()
    }

    #[test]
    fn attaches_bearer_when_token_stored() {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        tokens.save("abc.def.ghi").unwrap();

        let request = RequestAuthenticator::new(tokens).authorize(request());
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc.def.ghi"
        );
    }

    #[test]
    fn padded_stored_token_still_attaches() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(crate::auth::TOKEN_KEY, "abc.def.ghi\n").unwrap();

        let request = RequestAuthenticator::new(TokenStore::new(storage)).authorize(request());
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Bearer abc.def.ghi"
        );
    }

    #[test]
    fn forwards_unchanged_without_token() {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));

        let request = RequestAuthenticator::new(tokens).authorize(request());
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn follows_the_store_after_clear() {
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()));
        let authenticator = RequestAuthenticator::new(tokens.clone());

        tokens.save("t1").unwrap();
        assert!(authenticator.authorize(request()).headers().contains_key(AUTHORIZATION));

        tokens.clear().unwrap();
        assert!(!authenticator.authorize(request()).headers().contains_key(AUTHORIZATION));
    }
}
