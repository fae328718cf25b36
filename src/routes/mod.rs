//! Route handlers and router construction.

use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

pub mod availability;
pub mod schedules;
pub mod shifts;
pub mod users;

/// Settings the handlers need beyond the database pool.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bearer token lifetime in minutes.
    pub token_expire_minutes: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        // One day, matching the original deployment.
        Self {
            token_expire_minutes: 60 * 24,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let token_expire_minutes = std::env::var("TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|minutes| minutes.parse().ok())
            .unwrap_or_else(|| Self::default().token_expire_minutes);

        Self {
            token_expire_minutes,
        }
    }
}

pub fn basic_success() -> Json<Value> {
    Json(json!({ "message": "success" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full API router with the pool and config installed.
pub fn api_router(pool: SqlitePool, config: ApiConfig) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(users::register))
        .route("/api/auth/login", post(users::login))
        .route(
            "/api/auth/me",
            get(users::current_user).put(users::update_profile),
        )
        .route(
            "/api/availability",
            post(availability::upsert_mine).get(availability::all_for_month),
        )
        .route("/api/availability/me", get(availability::mine_for_month))
        .route("/api/availability/admin", get(availability::for_guard))
        .route("/api/availability/:id", delete(availability::remove))
        .route("/api/shifts", post(shifts::create).get(shifts::all))
        .route("/api/shifts/me", get(shifts::mine))
        .route("/api/shifts/:id", delete(shifts::remove))
        .route("/api/shifts/:id/paid", put(shifts::set_paid))
        .route("/api/schedules", post(schedules::create))
        .route("/api/schedules/me", get(schedules::mine))
        .layer(Extension(pool))
        .layer(Extension(config))
        .layer(CorsLayer::permissive())
}
