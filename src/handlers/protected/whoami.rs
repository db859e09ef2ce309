use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Caller, SessionService, WhoAmI};

/// GET /api/auth/whoami - the current account and its resolved scope
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": 2, "username": "asia_admin", "role": "company_admin", "company_id": 2,
///     "scope": { "role": "company_admin", "companies": { "kind": "only", "company_ids": [2, 3] } }
///   }
/// }
/// ```
pub async fn whoami(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<WhoAmI> {
    let me = SessionService::new(state.store.as_ref(), &state.tokens)
        .whoami(&caller)
        .await?;
    Ok(ApiResponse::success(me))
}
