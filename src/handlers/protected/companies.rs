// handlers/protected/companies.rs - /api/companies

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Company, CreateCompany, UpdateCompany};
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Caller, CompanyService};
use crate::tree::TreeItem;
use crate::types::CompanyId;

/// GET /api/companies - the company forest visible to the caller
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": [
///     { "id": 1, "name": "Headquarters", "parent_id": null, ..., "children": [
///       { "id": 2, "name": "Asia Branch", "parent_id": 1, ..., "children": [] }
///     ]}
///   ]
/// }
/// ```
pub async fn tree(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<TreeItem<Company>>> {
    let forest = CompanyService::new(state.store.as_ref()).tree(&caller).await?;
    Ok(ApiResponse::success(forest))
}

/// GET /api/companies/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Company> {
    let id: CompanyId = path_id(&id)?;
    let company = CompanyService::new(state.store.as_ref()).get(&caller, id).await?;
    Ok(ApiResponse::success(company))
}

/// POST /api/companies
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateCompany>, JsonRejection>,
) -> ApiResult<Company> {
    let request = json_body(payload)?;
    let company = CompanyService::new(state.store.as_ref())
        .create(&caller, request)
        .await?;
    Ok(ApiResponse::created(company))
}

/// PUT /api/companies/:id - partial update; `"parent_id": null` moves to the top level
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCompany>, JsonRejection>,
) -> ApiResult<Company> {
    let id: CompanyId = path_id(&id)?;
    let request = json_body(payload)?;
    let company = CompanyService::new(state.store.as_ref())
        .update(&caller, id, request)
        .await?;
    Ok(ApiResponse::success(company))
}

/// DELETE /api/companies/:id - refused while sub-companies or accounts remain
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id: CompanyId = path_id(&id)?;
    CompanyService::new(state.store.as_ref())
        .delete(&caller, id)
        .await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
