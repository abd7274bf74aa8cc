use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Capabilities, Profile};
use crate::services::identity::{AuthSession, IdentityError, IdentityUser};
use crate::services::roles;
use crate::state::AppState;

const MIN_PASSWORD_CHARS: usize = 8;

fn identity_error(e: IdentityError, rejected: impl FnOnce(String) -> AppError) -> AppError {
    match e {
        IdentityError::Rejected(reason) => rejected(reason),
        IdentityError::Unavailable(reason) => {
            tracing::warn!(error = %reason, "identity provider unavailable");
            AppError::Identity(reason)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user: IdentityUser,
}

// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let request = json_body(payload)?;
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidRequest("a valid email is required".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::InvalidRequest(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let user = state
        .identity
        .sign_up(&email, &request.password, full_name)
        .await
        .map_err(|e| identity_error(e, AppError::InvalidRequest))?;

    {
        let db = state.db()?;
        queries::ensure_profile(&db, &user.id, &user.email, full_name)?;
    }

    tracing::info!(user_id = %user.id, "user signed up");
    Ok((StatusCode::CREATED, Json(SignUpResponse { user })))
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    #[serde(flatten)]
    pub session: AuthSession,
    pub capabilities: Capabilities,
}

// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>, AppError> {
    let request = json_body(payload)?;
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidRequest("email and password are required".to_string()));
    }

    let session = state
        .identity
        .sign_in(&email, &request.password)
        .await
        .map_err(|e| identity_error(e, |_| AppError::Unauthorized))?;

    let role = {
        let db = state.db()?;
        queries::ensure_profile(&db, &session.user.id, &session.user.email, None)?;
        roles::resolve_role(&db, &session.user.id)?
    };

    tracing::info!(user_id = %session.user.id, role = role.as_str(), "user signed in");
    let capabilities = Capabilities::new(session.user.id.clone(), role);
    Ok(Json(SignInResponse {
        session,
        capabilities,
    }))
}

// POST /api/auth/signout
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = roles::bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    state
        .identity
        .sign_out(token)
        .await
        .map_err(|e| identity_error(e, |_| AppError::Unauthorized))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub profile: Option<Profile>,
    pub capabilities: Capabilities,
}

// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let capabilities = roles::authenticate(&state, &headers).await?;
    let profile = {
        let db = state.db()?;
        queries::get_profile(&db, &capabilities.user_id)?
    };
    Ok(Json(MeResponse {
        profile,
        capabilities,
    }))
}
