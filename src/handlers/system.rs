use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api - service index
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Roster API",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "endpoints": {
                "persons": "/api/persons[/:pk[/update|/delete]]",
                "owned_persons": "/api/owned-persons[/:pk], /api/search/owned-persons/:substring",
                "positions": "/api/positions[/:pk[/members]]",
                "teams": "/api/teams/:pk (basic auth)",
                "auth": "/api/auth/login, /api/auth/token, /api/auth/logout, /api/auth/whoami",
                "pages": "/, /persons[/:id], /accounts/login",
                "health": "/health",
            }
        }
    }))
}

/// GET /health - 503 when the store cannot be reached
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": backend
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": backend
                    }
                })),
            )
        }
    }
}
