//! Health and banner handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::db;
use crate::models::HealthResponse;
use crate::state::AppState;

/// GET / - Service banner
pub async fn root() -> &'static str {
    "Loan Billing Engine API"
}

/// GET /health - Liveness plus database connectivity
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.db_pool {
        Some(pool) => match db::check_health(pool).await {
            Ok(()) => "connected",
            Err(err) => {
                tracing::warn!(error = %err, "Health check failed");
                "disconnected"
            }
        },
        None => "not_configured",
    };

    let status = if database == "disconnected" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status,
        Json(HealthResponse {
            status: if status == StatusCode::OK {
                "healthy"
            } else {
                "degraded"
            },
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
