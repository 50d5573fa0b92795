use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::types::Role;

/// Unified login failure. Unknown username and wrong password map to the
/// same value so a caller cannot tell which part was wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Injected into request extensions after successful credential validation.
#[derive(Clone, Debug)]
pub struct AuthedUser {
    pub username: String,
    pub role: Role,
}

struct UserRecord {
    password_hash: String,
    role: Role,
}

/// Static credential table, built from config at startup and read-only after.
/// Each `authenticate` call is independent; there is no session state.
pub struct UserStore {
    salt: String,
    users: HashMap<String, UserRecord>,
}

impl UserStore {
    pub fn from_config(cfg: &AuthConfig) -> Self {
        let users = cfg
            .users
            .iter()
            .map(|u| {
                (
                    u.username.clone(),
                    UserRecord {
                        password_hash: u.password_hash.clone(),
                        role: u.role,
                    },
                )
            })
            .collect();
        Self {
            salt: cfg.salt.clone(),
            users,
        }
    }

    /// Verify a username/password pair. Username matching is case-sensitive
    /// and exact. The stored hash is compared against the recomputed one
    /// with a constant-time primitive.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Role, AuthError> {
        let record = self
            .users
            .get(username)
            .ok_or(AuthError::InvalidCredentials)?;
        let computed = hash_password(&self.salt, password);
        if computed
            .as_bytes()
            .ct_eq(record.password_hash.as_bytes())
            .into()
        {
            Ok(record.role)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Salted SHA-256 of a password, returned as hex. Pure; also used offline via
/// the `hash-password` subcommand to mint entries for the user table.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse `Authorization: Basic <base64(user:pass)>`.
fn extract_basic(req: &Request<Body>) -> Option<(String, String)> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({"error": "invalid credentials"})),
    )
        .into_response()
}

/// Middleware for the data routes: validates Basic credentials against the
/// user store on every request (stateless by design) and injects `AuthedUser`
/// into extensions.
pub async fn require_user(request: Request<Body>, next: Next) -> Result<Response, Response> {
    let store = request
        .extensions()
        .get::<Arc<UserStore>>()
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "user store not configured",
            )
                .into_response()
        })?;

    let (username, password) = extract_basic(&request).ok_or_else(unauthorized)?;
    let role = store
        .authenticate(&username, &password)
        .map_err(|_| unauthorized())?;

    let mut request = request;
    request.extensions_mut().insert(AuthedUser { username, role });
    Ok(next.run(request).await)
}
