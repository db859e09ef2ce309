//! Storage capabilities the services depend on. [`crate::database::PgStore`]
//! implements them over PostgreSQL; tests use an in-memory store.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Account, AccountChanges, AccountCredentials, Company, CreateCompany, CreateMenu, Menu,
    NewAccount, Role, UpdateCompany, UpdateMenu,
};
use crate::types::{AccountId, CompanyId, MenuId, RoleId};

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>, DatabaseError>;

    async fn list_companies(&self) -> Result<Vec<Company>, DatabaseError>;

    async fn create_company(&self, input: &CreateCompany) -> Result<Company, DatabaseError>;

    async fn update_company(
        &self,
        id: CompanyId,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, DatabaseError>;

    /// Returns false when no row matched
    async fn delete_company(&self, id: CompanyId) -> Result<bool, DatabaseError>;

    async fn count_child_companies(&self, id: CompanyId) -> Result<i64, DatabaseError>;

    async fn count_company_accounts(&self, id: CompanyId) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn get_role_id_by_name(&self, name: &str) -> Result<Option<RoleId>, DatabaseError>;

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DatabaseError>;

    async fn list_roles(&self) -> Result<Vec<Role>, DatabaseError>;
}

#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn get_menu(&self, id: MenuId) -> Result<Option<Menu>, DatabaseError>;

    async fn list_menus(&self) -> Result<Vec<Menu>, DatabaseError>;

    /// Active menus directly related to the role; ancestors are not implied
    async fn list_active_menus_for_role(&self, role_id: RoleId) -> Result<Vec<Menu>, DatabaseError>;

    async fn list_assigned_menu_ids(&self, role_id: RoleId) -> Result<Vec<MenuId>, DatabaseError>;

    /// Replace every `(role_id, *)` relation in one transaction
    async fn replace_assignments(
        &self,
        role_id: RoleId,
        menu_ids: &[MenuId],
    ) -> Result<(), DatabaseError>;

    async fn create_menu(&self, input: &CreateMenu) -> Result<Menu, DatabaseError>;

    async fn update_menu(&self, id: MenuId, input: &UpdateMenu) -> Result<Option<Menu>, DatabaseError>;

    /// Deletes the menu and its role relations together
    async fn delete_menu(&self, id: MenuId) -> Result<bool, DatabaseError>;

    async fn count_child_menus(&self, id: MenuId) -> Result<i64, DatabaseError>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// `None` lists every account; `Some` restricts to the given companies
    async fn list_accounts(
        &self,
        companies: Option<&BTreeSet<CompanyId>>,
    ) -> Result<Vec<Account>, DatabaseError>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, DatabaseError>;

    async fn find_credentials(&self, username: &str)
        -> Result<Option<AccountCredentials>, DatabaseError>;

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError>;

    async fn create_account(&self, input: &NewAccount) -> Result<Account, DatabaseError>;

    async fn update_account(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<Option<Account>, DatabaseError>;

    async fn delete_account(&self, id: AccountId) -> Result<bool, DatabaseError>;

    async fn set_password_hash(&self, id: AccountId, hash: &str) -> Result<bool, DatabaseError>;
}

/// Everything the HTTP layer needs from storage
pub trait Store: CompanyRepository + RoleRepository + MenuRepository + AccountRepository {}

impl<T> Store for T where
    T: CompanyRepository + RoleRepository + MenuRepository + AccountRepository + ?Sized
{
}
