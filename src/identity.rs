//! Identity provider boundary.
//!
//! Accounts, passwords and sessions live with an external provider that
//! issues HS256 bearer JWTs. This module only verifies them and hands the
//! actor id (`sub`) to the handlers.

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Actor (user) id
    pub exp: i64,    // Expiry timestamp
    pub iat: i64,    // Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Clone)]
pub struct IdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    audience: Option<String>,
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider")
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl IdentityProvider {
    pub fn new(secret: &str, audience: Option<String>) -> Self {
        let mut validation = Validation::default();
        match &audience {
            Some(aud) => validation.set_audience(&[aud.as_str()]),
            None => validation.validate_aud = false,
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            audience,
        }
    }

    /// Verify a bearer token and return the actor it was issued to.
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            AppError::Unauthenticated
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthenticated)
    }

    /// Mint a token for `actor_id`. Used for local development and tests;
    /// production tokens come from the identity provider itself.
    pub fn issue(&self, actor_id: Uuid, ttl: Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: actor_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            aud: self.audience.clone(),
            email: None,
            role: Some("authenticated".to_string()),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Actor behind the request's bearer token. Missing or invalid tokens
    /// are `Unauthenticated`.
    pub fn actor_from_headers(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        let token = extract_bearer_token(headers).ok_or(AppError::Unauthenticated)?;
        self.verify(token)
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
