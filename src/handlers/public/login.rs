// handlers/public/login.rs - POST /api/login handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::app::AppState;
use crate::handlers::json_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginRequest, LoginResponse, SessionService};

/// POST /api/login - Authenticate credentials and receive a JWT
///
/// Expected Input:
/// ```json
/// { "username": "admin", "password": "..." }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": { "token": "eyJhbGciOiJIUzI1NiI...", "role": "superadmin", "expires_in": 86400 }
/// }
/// ```
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let request = json_body(payload)?;
    let response = SessionService::new(state.store.as_ref(), &state.tokens)
        .login(request)
        .await?;
    Ok(ApiResponse::success(response))
}
