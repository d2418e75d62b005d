//! Bearer-token identity verification.
//!
//! Sharebox trusts HS256 JWTs issued by the surrounding auth service.
//! Tokens carry the user id and admin flag; endpoints either require an
//! identity or accept requests anonymously with a reduced policy.

use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// The authenticated requester, decoded from a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// User id.
    pub id: i64,
    /// Whether the user has admin privileges.
    pub is_admin: bool,
}

/// JWT claims carried by Sharebox tokens.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: i64,
    /// Admin flag.
    #[serde(default)]
    admin: bool,
    /// Expiry as a unix timestamp.
    exp: i64,
}

/// Verify a raw token string and return the identity it encodes.
pub fn verify_token(token: &str, secret: &str) -> Option<Identity> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(Identity {
        id: data.claims.sub,
        is_admin: data.claims.admin,
    })
}

/// Issue a token for the given identity, valid for `ttl_seconds`.
///
/// Token issuance belongs to the auth service; this helper exists for
/// local tooling and tests.
pub fn issue_token(identity: Identity, secret: &str, ttl_seconds: i64) -> String {
    let claims = Claims {
        sub: identity.id,
        admin: identity.is_admin,
        exp: chrono::Utc::now().timestamp() + ttl_seconds,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("HS256 signing cannot fail")
}

/// Extract the bearer token from an Authorization header, if present.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Optional authentication: a missing or invalid token yields `None`
/// rather than an error, and the request proceeds anonymously.
pub fn optional_identity(headers: &HeaderMap, secret: &str) -> Option<Identity> {
    bearer_token(headers).and_then(|t| verify_token(t, secret))
}

/// Mandatory authentication: reject the request when no valid token is
/// presented.
pub fn require_identity(headers: &HeaderMap, secret: &str) -> Result<Identity, ApiError> {
    optional_identity(headers, secret).ok_or(ApiError::AuthRequired)
}

/// Mandatory admin authentication.
pub fn require_admin(headers: &HeaderMap, secret: &str) -> Result<Identity, ApiError> {
    let identity = require_identity(headers, secret)?;
    if !identity.is_admin {
        return Err(ApiError::Forbidden(
            "Access denied. Admins only.".to_string(),
        ));
    }
    Ok(identity)
}
