use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::{success, AppState, JsonBody};
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Identity, User};

pub const AUTH_SECRET_HEADER: &str = "x-auth-secret";

/// The signed-in user behind the request's bearer token, together with the
/// connection the session was resolved on. Handlers keep using that
/// connection. Rejects with 401 when the header is missing or the token is
/// unknown.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
    pub db: Database,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let db = Database::connect(&state.db_path)?;
        let user = db.resolve_session(token)?.ok_or(AppError::Unauthorized)?;
        Ok(Self {
            user,
            token: token.to_string(),
            db,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Compares SHA-256 digests in constant time.
fn secrets_match(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());
    expected.ct_eq(&presented).into()
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

/// Called by the identity-provider bridge once the OAuth handshake is done.
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(identity): JsonBody<Identity>,
) -> Result<Json<SessionResponse>> {
    let presented = headers
        .get(AUTH_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    match (state.auth_secret.as_deref(), presented) {
        (Some(expected), Some(presented)) if secrets_match(expected, presented) => {}
        _ => return Err(AppError::Unauthorized),
    }

    let db = Database::connect(&state.db_path)?;
    let user = db.upsert_user(&identity)?;
    let token = db.create_session(&user.id)?;
    tracing::info!(user_id = %user.id, "signed in");
    Ok(Json(SessionResponse { token, user }))
}

pub async fn current_session(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

pub async fn sign_out(current: CurrentUser) -> Result<Json<Value>> {
    current.db.delete_session(&current.token)?;
    tracing::info!(user_id = %current.user.id, "signed out");
    Ok(success())
}
