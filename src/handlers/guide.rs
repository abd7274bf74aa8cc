use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::json_body;
use crate::errors::AppError;
use crate::services::guide::{self, GuideAnswer, GuideError, Language};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub message: String,
    pub language: Option<String>,
}

// POST /api/guide/ask
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<GuideAnswer>, AppError> {
    let request = json_body(payload)?;
    let language = Language::from_code(request.language.as_deref());

    match guide::ask(state.llm.as_ref(), &request.message, language).await {
        Ok(answer) => Ok(Json(answer)),
        Err(GuideError::InvalidQuestion(reason)) => Err(AppError::InvalidRequest(reason)),
        Err(GuideError::Provider(e)) => {
            tracing::error!(error = %e, language = ?language, "virtual guide failed");
            Err(AppError::Assistant(language.apology().to_string()))
        }
    }
}
