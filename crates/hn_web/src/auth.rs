//! Bearer-token identity for the API.
//!
//! Tokens are HS256 JWTs carrying a `user_id` and an `exp` claim. Handlers
//! that take a [`CurrentUser`] argument reject requests without a valid token
//! with `401 Unauthenticated`.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use hn_core::{Error, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::response::ApiError;
use crate::state::AppState;

pub const DEFAULT_EXPIRE_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// The verified caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
}

/// Issues and verifies identity tokens signed with a shared secret.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expires_in: Duration,
}

impl TokenAuthority {
    pub fn new(secret: &[u8], expires_in: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            expires_in,
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String> {
        let claims = Claims {
            user_id,
            exp: (Utc::now() + self.expires_in).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::External(anyhow::Error::new(e).context("Failed to sign token")))
    }

    pub fn verify(&self, token: &str) -> Result<CurrentUser> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| Error::Unauthenticated(format!("Could not validate credentials: {}", e)))?;
        Ok(CurrentUser {
            user_id: data.claims.user_id,
        })
    }

    /// Verifies the value of an `Authorization: Bearer <token>` header.
    pub fn verify_header(&self, header: Option<&str>) -> Result<CurrentUser> {
        let header = header
            .ok_or_else(|| Error::Unauthenticated("Missing Authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Unauthenticated("Expected a Bearer token".to_string()))?;
        self.verify(token)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        Ok(state.tokens.verify_header(header)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> TokenAuthority {
        TokenAuthority::new(b"test-secret", Duration::days(DEFAULT_EXPIRE_DAYS))
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = authority();
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), CurrentUser { user_id: 42 });

        let header = format!("Bearer {}", token);
        assert_eq!(tokens.verify_header(Some(&header)).unwrap().user_id, 42);
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = authority().issue(1).unwrap();
        let other = TokenAuthority::new(b"other-secret", Duration::days(1));
        assert!(matches!(other.verify(&token), Err(Error::Unauthenticated(_))));
    }

    #[test]
    fn test_rejects_expired_token() {
        let tokens = TokenAuthority::new(b"test-secret", Duration::hours(-2));
        let token = tokens.issue(1).unwrap();
        assert!(matches!(tokens.verify(&token), Err(Error::Unauthenticated(_))));
    }

    #[test]
    fn test_rejects_bad_headers() {
        let tokens = authority();
        assert!(tokens.verify_header(None).is_err());
        assert!(tokens.verify_header(Some("Basic abc")).is_err());
        assert!(tokens.verify_header(Some("Bearer ")).is_err());
        assert!(tokens.verify_header(Some("Bearer not.a.jwt")).is_err());
    }
}
