use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::json_body;
use crate::errors::AppError;
use crate::models::{CatalogEntry, CatalogKind};
use crate::services::{catalog, roles};
use crate::state::AppState;

fn parse_kind(kind: &str) -> Result<CatalogKind, AppError> {
    CatalogKind::parse(kind).ok_or_else(|| AppError::NotFound(format!("catalog {kind}")))
}

// GET /api/admin/catalog/:kind
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let kind = parse_kind(&kind)?;
    Ok(Json(catalog::list(&state, &caps, kind)?))
}

// POST /api/admin/catalog/:kind
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CatalogEntry>), AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let kind = parse_kind(&kind)?;
    let entry = catalog::create(&state, &caps, kind, json_body(payload)?)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

// GET /api/admin/catalog/:kind/:id
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<CatalogEntry>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let kind = parse_kind(&kind)?;
    Ok(Json(catalog::get(&state, &caps, kind, &id)?))
}

// PUT /api/admin/catalog/:kind/:id
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<CatalogEntry>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let kind = parse_kind(&kind)?;
    Ok(Json(catalog::update(&state, &caps, kind, &id, json_body(payload)?)?))
}

// DELETE /api/admin/catalog/:kind/:id
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let kind = parse_kind(&kind)?;
    catalog::delete(&state, &caps, kind, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
