//! Caller identity
//!
//! Decodes the HS256 token a client presents (cookie `jwt`, else a bearer
//! header) into the caller's email. What that email may do is decided by the
//! capability gate, not here.

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOKEN_COOKIE: &str = "jwt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Token codec, built once from configuration and shared by reference
#[derive(Clone)]
pub struct AuthConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthConfig {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.required_spec_claims = ["exp".to_string()].into_iter().collect();
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue_token(&self, email: &str, ttl_hours: i64) -> Result<String, AuthError> {
        let exp = (Utc::now() + Duration::hours(ttl_hours)).timestamp();
        let exp = usize::try_from(exp)
            .map_err(|_| AuthError::Signing("token expiry is before the epoch".to_string()))?;
        let claims = IdentityClaims {
            email: email.to_string(),
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map(|decoded| decoded.claims)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))
    }

    /// `Ok(None)` when no token was presented
    pub fn resolve_identity(&self, headers: &HeaderMap) -> Result<Option<String>, AuthError> {
        match token_from_headers(headers) {
            Some(token) => self.decode(&token).map(|claims| Some(claims.email)),
            None => Ok(None),
        }
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie.filter(|token| !token.is_empty()).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn token_roundtrip_yields_email() {
        let auth = AuthConfig::new("test-secret");
        let token = auth.issue_token("boss@example.com", 1).unwrap();
        assert_eq!(auth.decode(&token).unwrap().email, "boss@example.com");
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let auth = AuthConfig::new("test-secret");
        let foreign = AuthConfig::new("other-secret")
            .issue_token("boss@example.com", 1)
            .unwrap();
        assert!(matches!(auth.decode(&foreign), Err(AuthError::InvalidToken(_))));

        let expired = auth.issue_token("boss@example.com", -2).unwrap();
        assert!(matches!(auth.decode(&expired), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn identity_comes_from_cookie_before_bearer() {
        let auth = AuthConfig::new("test-secret");
        let cookie_token = auth.issue_token("cookie@example.com", 1).unwrap();
        let bearer_token = auth.issue_token("bearer@example.com", 1).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer_token)).unwrap(),
        );
        assert_eq!(
            auth.resolve_identity(&headers).unwrap().as_deref(),
            Some("bearer@example.com")
        );

        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; jwt={}", cookie_token)).unwrap(),
        );
        assert_eq!(
            auth.resolve_identity(&headers).unwrap().as_deref(),
            Some("cookie@example.com")
        );
    }

    #[test]
    fn absent_token_is_no_identity() {
        let auth = AuthConfig::new("test-secret");
        assert_eq!(auth.resolve_identity(&HeaderMap::new()).unwrap(), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("jwt=garbage"));
        assert!(auth.resolve_identity(&headers).is_err());
    }
}
