// handlers/protected/accounts.rs - /api/accounts
//
// Every operation is scoped to the caller's company subtree; account 1 is
// never modified here (the operator CLI is the recovery path).

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Account;
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{
    AccountService, Caller, CreateAccountRequest, ResetPasswordRequest, UpdateAccountRequest,
};
use crate::types::AccountId;

/// GET /api/accounts - accounts in the caller's scope
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<Account>> {
    let accounts = AccountService::new(state.store.as_ref()).list(&caller).await?;
    Ok(ApiResponse::success(accounts))
}

/// POST /api/accounts
///
/// Expected Input:
/// ```json
/// { "username": "taipei_sales", "password": "...", "role": "sales", "company_id": 3 }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult<Account> {
    let request = json_body(payload)?;
    let account = AccountService::new(state.store.as_ref())
        .create(&caller, request)
        .await?;
    Ok(ApiResponse::created(account))
}

/// PUT /api/accounts/:id - change role, company or active flag
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> ApiResult<Account> {
    let id: AccountId = path_id(&id)?;
    let request = json_body(payload)?;
    let account = AccountService::new(state.store.as_ref())
        .update(&caller, id, request)
        .await?;
    Ok(ApiResponse::success(account))
}

/// DELETE /api/accounts/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id: AccountId = path_id(&id)?;
    AccountService::new(state.store.as_ref())
        .delete(&caller, id)
        .await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

/// PUT /api/accounts/:id/reset-password
///
/// Expected Input:
/// ```json
/// { "password": "new-password" }
/// ```
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let id: AccountId = path_id(&id)?;
    let request = json_body(payload)?;
    AccountService::new(state.store.as_ref())
        .reset_password(&caller, id, request)
        .await?;
    Ok(ApiResponse::success(json!({ "id": id, "password_reset": true })))
}
