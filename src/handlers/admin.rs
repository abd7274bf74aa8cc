use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::json_body;
use crate::db::queries::{AuditEntry, BookingFilter, ProfileFilter};
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Profile, Role};
use crate::services::admin::{self, DashboardStats};
use crate::services::roles;
use crate::state::AppState;

const MAX_LIMIT: i64 = 500;

fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

fn parse_status(value: &str) -> Result<BookingStatus, AppError> {
    BookingStatus::parse(value.trim())
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown booking status: {value}")))
}

fn parse_role(value: &str) -> Result<Role, AppError> {
    Role::parse(value.trim()).ok_or_else(|| AppError::InvalidRequest(format!("unknown role: {value}")))
}

// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardStats>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    Ok(Json(admin::dashboard(&state, &caps)?))
}

// GET /api/admin/bookings
#[derive(Debug, Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl BookingsQuery {
    fn into_filter(self, default_limit: i64) -> Result<BookingFilter, AppError> {
        Ok(BookingFilter {
            status: self
                .status
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(parse_status)
                .transpose()?,
            search: self.search,
            limit: clamp_limit(self.limit, default_limit),
        })
    }
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let filter = query.into_filter(100)?;
    Ok(Json(admin::list_bookings(&state, &caps, &filter)?))
}

// GET /api/admin/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    Ok(Json(admin::get_booking(&state, &caps, &id)?))
}

// POST /api/admin/bookings/:id/status
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

pub async fn set_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Booking>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let status = parse_status(&json_body(payload)?.status)?;
    Ok(Json(admin::set_booking_status(&state, &caps, &id, status)?))
}

// DELETE /api/admin/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    admin::delete_booking(&state, &caps, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/admin/payments/export.csv
pub async fn export_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Response, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let filter = query.into_filter(MAX_LIMIT)?;
    let csv = admin::export_payments(&state, &caps, &filter)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"payments.csv\""),
        ],
        csv,
    )
        .into_response())
}

// GET /api/admin/users
#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub role: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let filter = ProfileFilter {
        role: query
            .role
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(parse_role)
            .transpose()?,
        search: query.search,
        limit: clamp_limit(query.limit, 100),
    };
    Ok(Json(admin::list_profiles(&state, &caps, &filter)?))
}

// POST /api/admin/users/:user_id/role
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub role: String,
}

pub async fn set_user_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    payload: Result<Json<RoleRequest>, JsonRejection>,
) -> Result<Json<Profile>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    let role = parse_role(&json_body(payload)?.role)?;
    Ok(Json(admin::set_role(&state, &caps, &user_id, role)?))
}

// GET /api/admin/audit
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

pub async fn get_audit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let caps = roles::authenticate(&state, &headers).await?;
    Ok(Json(admin::list_audit(&state, &caps, clamp_limit(query.limit, 50))?))
}
