pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn cors_layer(origins: &str) -> CorsLayer {
    let allow_origin = if origins.trim() == "*" {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!(origin = %o, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/auth/signup", post(handlers::auth::sign_up))
        .route("/api/auth/signin", post(handlers::auth::sign_in))
        .route("/api/auth/signout", post(handlers::auth::sign_out))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings/quote", post(handlers::bookings::quote))
        .route("/api/bookings/checkout", post(handlers::bookings::checkout))
        .route("/api/bookings/confirm", post(handlers::bookings::confirm))
        .route("/webhook/stripe", post(handlers::webhook::stripe_webhook))
        .route("/api/guide/ask", post(handlers::guide::ask))
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id",
            get(handlers::admin::get_booking).delete(handlers::admin::delete_booking),
        )
        .route(
            "/api/admin/bookings/:id/status",
            post(handlers::admin::set_booking_status),
        )
        .route(
            "/api/admin/payments/export.csv",
            get(handlers::admin::export_payments),
        )
        .route("/api/admin/users", get(handlers::admin::get_users))
        .route(
            "/api/admin/users/:user_id/role",
            post(handlers::admin::set_user_role),
        )
        .route("/api/admin/audit", get(handlers::admin::get_audit))
        .route(
            "/api/admin/catalog/:kind",
            get(handlers::catalog::list_entries).post(handlers::catalog::create_entry),
        )
        .route(
            "/api/admin/catalog/:kind/:id",
            get(handlers::catalog::get_entry)
                .put(handlers::catalog::update_entry)
                .delete(handlers::catalog::delete_entry),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
