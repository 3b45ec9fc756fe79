//! Bearer token decoding.
//!
//! Tokens are three dot-separated segments; the middle one is base64 JSON
//! carrying the claims. Signatures are NOT verified: the server enforces
//! authorization, the client only reads identity and expiry.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// Expiry as Unix seconds
    pub exp: i64,
}

impl Claims {
    /// User derived from the claims, used until the server confirms the token.
    pub fn provisional_user(&self, now: DateTime<Utc>) -> User {
        let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        User {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: Some(stamp.clone()),
            updated_at: Some(stamp),
        }
    }
}

/// Decode the claims segment of a token.
pub fn decode(token: &str) -> Result<Claims, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::MalformedToken("missing claims segment".to_string()))?;

    let trimmed = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| AuthError::MalformedToken(format!("claims are not base64: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::MalformedToken(format!("claims are not valid JSON: {}", e)))
}

/// Decode and check expiry against `now` (Unix seconds).
pub fn check(token: &str, now: i64) -> Result<Claims, AuthError> {
    let claims = decode(token)?;
    if claims.exp > now {
        Ok(claims)
    } else {
        Err(AuthError::ExpiredToken { exp: claims.exp })
    }
}

/// `true` when the token decodes and has not expired at `now`.
pub fn is_valid(token: &str, now: i64) -> bool {
    check(token, now).is_ok()
}

/// Build an unsigned token carrying `claims`; the signature segment is a
/// placeholder.
#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &Claims) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = serde_json::to_vec(claims).unwrap_or_default();
    format!("{}.{}.signature", header, URL_SAFE_NO_PAD.encode(body))
}
