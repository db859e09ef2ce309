use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::RoleId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}
