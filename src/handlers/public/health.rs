use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

/// GET / - service information
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Fastener API",
            "version": version,
            "description": "Hierarchical company, account and menu administration",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/api/login (public - token acquisition)",
                "auth": "/api/auth/whoami (protected)",
                "accounts": "/api/accounts[/:id[/reset-password]] (protected, admin)",
                "companies": "/api/companies[/:id] (protected, admin)",
                "menus": "/api/menus/tree, /api/menus[/:id] (protected, superadmin)",
                "user_menus": "/api/user-menus (protected)",
                "roles": "/api/roles[/:id/menus] (protected, admin)",
            }
        }
    }))
}

/// GET /health - liveness plus database reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let database = match &state.database {
        Some(db) => db.health_check().await,
        None => Ok(()),
    };

    match database {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
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
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
