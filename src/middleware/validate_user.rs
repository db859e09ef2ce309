use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;
use crate::services::Caller;

/// Middleware that reloads the token's account from the store.
///
/// The injected [`Caller`] carries the role and company as currently
/// stored, so demotions and moves take effect on the next request rather
/// than when the token expires.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Get AuthUser from JWT middleware
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let account = state
        .store
        .get_account(auth_user.account_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                "User validation failed: account {} ('{}') no longer exists",
                auth_user.account_id,
                auth_user.username
            );
            ApiError::forbidden(format!("User '{}' is not active", auth_user.username))
        })?;

    // Verify that JWT claims match database record
    if account.username != auth_user.username {
        tracing::warn!(
            "User validation failed: JWT user '{}' doesn't match stored username '{}'",
            auth_user.username,
            account.username
        );
        return Err(ApiError::forbidden("User authentication mismatch"));
    }

    if !account.is_active {
        tracing::warn!("User validation failed: account '{}' is deactivated", account.username);
        return Err(ApiError::forbidden(format!("User '{}' is not active", account.username)));
    }

    if account.role != auth_user.role || account.company_id != auth_user.company_id {
        tracing::debug!(
            "Account '{}' changed since login: role '{}' -> '{}', company {} -> {}",
            account.username,
            auth_user.role,
            account.role,
            auth_user.company_id,
            account.company_id
        );
    }

    let caller = Caller::from(&account);
    tracing::debug!(
        "User validation successful: {} ({}) in company {}",
        caller.username,
        caller.role,
        caller.company_id
    );

    // Inject validated caller into request
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
