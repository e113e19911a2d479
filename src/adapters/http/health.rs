//! Health probe endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Clone)]
pub struct HealthAppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    database: &'static str,
}

/// GET /health
///
/// Reports degraded with a 503 when the database does not answer, so load
/// balancers stop routing deliveries at a node that cannot record them.
pub async fn health(State(state): State<HealthAppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthStatus {
                status: "ok",
                database: "up",
            }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "health probe failed to reach database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "degraded",
                    database: "down",
                }),
            )
        }
    }
}

pub fn health_router() -> Router<HealthAppState> {
    Router::new().route("/health", get(health))
}
