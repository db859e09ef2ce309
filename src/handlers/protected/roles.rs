// handlers/protected/roles.rs - /api/roles

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::database::models::Role;
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Caller, MenuService};
use crate::types::{MenuId, RoleId};

#[derive(Debug, Deserialize)]
pub struct RoleMenusRequest {
    pub menu_ids: Vec<MenuId>,
}

#[derive(Debug, Serialize)]
pub struct RoleMenus {
    pub role_id: RoleId,
    pub menu_ids: Vec<MenuId>,
}

/// GET /api/roles
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<Role>> {
    let roles = MenuService::new(state.store.as_ref()).roles(&caller).await?;
    Ok(ApiResponse::success(roles))
}

/// GET /api/roles/:id/menus - assigned menu ids, ascending
pub async fn menus_get(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<RoleMenus> {
    let role_id: RoleId = path_id(&id)?;
    let menu_ids = MenuService::new(state.store.as_ref())
        .role_assignments(&caller, role_id)
        .await?;
    Ok(ApiResponse::success(RoleMenus { role_id, menu_ids }))
}

/// PUT /api/roles/:id/menus - replace the full assignment set atomically
///
/// Expected Input:
/// ```json
/// { "menu_ids": [10, 11] }
/// ```
pub async fn menus_put(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<RoleMenusRequest>, JsonRejection>,
) -> ApiResult<RoleMenus> {
    let role_id: RoleId = path_id(&id)?;
    let request = json_body(payload)?;
    let menu_ids = MenuService::new(state.store.as_ref())
        .replace_assignments(&caller, role_id, request.menu_ids)
        .await?;
    Ok(ApiResponse::success(RoleMenus { role_id, menu_ids }))
}
