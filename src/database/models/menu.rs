use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::tree::TreeNode;
use crate::types::MenuId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub parent_id: Option<MenuId>,
    #[serde(default)]
    pub order_no: i32,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool {
    true
}

impl TreeNode for Menu {
    type Id = MenuId;
    type Key = i32;

    fn node_id(&self) -> MenuId {
        self.id
    }

    fn parent_id(&self) -> Option<MenuId> {
        self.parent_id
    }

    fn sort_key(&self) -> i32 {
        self.order_no
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMenu {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub parent_id: Option<MenuId>,
    #[serde(default)]
    pub order_no: i32,
    #[serde(default = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMenu {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub parent_id: Option<Option<MenuId>>,
    #[serde(default)]
    pub order_no: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}
