use axum::http::HeaderMap;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Capabilities, Role};
use crate::services::identity::IdentityUser;
use crate::state::AppState;

// No profile means `user`, not an error.
pub fn resolve_role(conn: &Connection, user_id: &str) -> anyhow::Result<Role> {
    Ok(queries::get_profile(conn, user_id)?
        .map(|p| p.role)
        .unwrap_or_default())
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn authenticate_user(state: &AppState, headers: &HeaderMap) -> Result<IdentityUser, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;

    match state.identity.user_for_token(token).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AppError::Unauthorized),
        Err(e) => {
            tracing::warn!(error = %e, "identity lookup failed, denying access");
            Err(AppError::Unauthorized)
        }
    }
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Capabilities, AppError> {
    let user = authenticate_user(state, headers).await?;

    let role = {
        let db = state.db().map_err(|e| {
            tracing::error!(error = %e, "store unavailable, denying access");
            AppError::Unauthorized
        })?;
        resolve_role(&db, &user.id).map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "role lookup failed, denying access");
            AppError::Unauthorized
        })?
    };

    Ok(Capabilities::new(user.id, role))
}

pub async fn optional_user_id(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if bearer_token(headers).is_none() {
        return None;
    }
    authenticate_user(state, headers).await.ok().map(|u| u.id)
}
