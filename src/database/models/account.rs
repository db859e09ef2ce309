use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::{AccountId, CompanyId, RoleId};

/// Account as returned to clients. The password hash lives only in
/// [`AccountCredentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub role_id: RoleId,
    pub role: String,
    pub company_id: CompanyId,
    pub is_active: bool,
}

/// Login lookup row; deliberately not `Serialize`
#[derive(Clone, FromRow)]
pub struct AccountCredentials {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub company_id: CompanyId,
    pub is_active: bool,
}

impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("company_id", &self.company_id)
            .field("is_active", &self.is_active)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub role_id: RoleId,
    pub company_id: CompanyId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub role_id: Option<RoleId>,
    pub company_id: Option<CompanyId>,
    pub is_active: Option<bool>,
}
