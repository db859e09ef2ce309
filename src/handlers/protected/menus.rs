// handlers/protected/menus.rs - /api/menus, /api/user-menus

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{CreateMenu, Menu, UpdateMenu};
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Caller, MenuService};
use crate::tree::TreeItem;
use crate::types::MenuId;

/// GET /api/user-menus - navigation for the caller's role
pub async fn user_menus(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<TreeItem<Menu>>> {
    let forest = MenuService::new(state.store.as_ref()).user_menus(&caller).await?;
    Ok(ApiResponse::success(forest))
}

/// GET /api/menus/tree - every menu including inactive ones
pub async fn full_tree(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Vec<TreeItem<Menu>>> {
    let forest = MenuService::new(state.store.as_ref())
        .full_menu_tree(&caller)
        .await?;
    Ok(ApiResponse::success(forest))
}

/// POST /api/menus
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateMenu>, JsonRejection>,
) -> ApiResult<Menu> {
    let request = json_body(payload)?;
    let menu = MenuService::new(state.store.as_ref())
        .create_menu(&caller, request)
        .await?;
    Ok(ApiResponse::created(menu))
}

/// PUT /api/menus/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateMenu>, JsonRejection>,
) -> ApiResult<Menu> {
    let id: MenuId = path_id(&id)?;
    let request = json_body(payload)?;
    let menu = MenuService::new(state.store.as_ref())
        .update_menu(&caller, id, request)
        .await?;
    Ok(ApiResponse::success(menu))
}

/// DELETE /api/menus/:id - also drops the menu's role relations
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id: MenuId = path_id(&id)?;
    MenuService::new(state.store.as_ref())
        .delete_menu(&caller, id)
        .await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
