//! In-memory store for unit tests.
//!
//! Mirrors the PostgreSQL store closely enough for service and router tests:
//! username uniqueness and foreign keys are enforced, and a failed
//! `replace_assignments` leaves the previous relations untouched.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::database::models::{
    Account, AccountChanges, AccountCredentials, Company, CreateCompany, CreateMenu, Menu,
    NewAccount, Role, UpdateCompany, UpdateMenu,
};
use crate::database::repository::{
    AccountRepository, CompanyRepository, MenuRepository, RoleRepository,
};
use crate::database::DatabaseError;
use crate::services::Caller;
use crate::types::{AccountId, CompanyId, MenuId, RoleId};

/// Hash stored for seeded accounts; never verifies against any password
pub const PLACEHOLDER_HASH: &str = "!";

#[derive(Clone)]
struct AccountRow {
    username: String,
    password_hash: String,
    role_id: RoleId,
    company_id: CompanyId,
    is_active: bool,
}

#[derive(Default)]
struct State {
    companies: BTreeMap<CompanyId, Company>,
    roles: BTreeMap<RoleId, String>,
    menus: BTreeMap<MenuId, Menu>,
    relations: BTreeSet<(RoleId, MenuId)>,
    accounts: BTreeMap<AccountId, AccountRow>,
}

impl State {
    fn account(&self, id: AccountId, row: &AccountRow) -> Account {
        Account {
            id,
            username: row.username.clone(),
            role_id: row.role_id,
            role: self.roles.get(&row.role_id).cloned().unwrap_or_default(),
            company_id: row.company_id,
            is_active: row.is_active,
        }
    }

    fn check_account_refs(&self, role_id: RoleId, company_id: CompanyId) -> Result<(), DatabaseError> {
        if !self.roles.contains_key(&role_id) {
            return Err(DatabaseError::Constraint(format!("role {} does not exist", role_id)));
        }
        if !self.companies.contains_key(&company_id) {
            return Err(DatabaseError::Constraint(format!("company {} does not exist", company_id)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_assignments: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Companies 1 Headquarters > {2 Asia Branch > 3 Taipei Office, 4 Europe Branch};
    /// roles superadmin, company_admin, sales; one admin per tier and two sales accounts.
    pub fn seeded() -> Self {
        let store = Self::new();

        store.insert_company(1, "Headquarters", None);
        store.insert_company(2, "Asia Branch", Some(1));
        store.insert_company(3, "Taipei Office", Some(2));
        store.insert_company(4, "Europe Branch", Some(1));

        store.insert_role(1, "superadmin");
        store.insert_role(2, "company_admin");
        store.insert_role(3, "sales");

        store.insert_account(1, "admin", 1, 1);
        store.insert_account(2, "asia_admin", 2, 2);
        store.insert_account(3, "taipei_sales", 3, 3);
        store.insert_account(4, "europe_admin", 2, 4);
        store.insert_account(5, "taipei_clerk", 3, 3);

        store.insert_menu(1, "Dashboard", None, 1, true);
        store.insert_menu(2, "Settings", None, 2, true);
        store.insert_menu(3, "Accounts", Some(2), 1, true);
        store.insert_menu(4, "Companies", Some(2), 2, true);
        store.insert_menu(5, "Legacy", None, 3, false);
        store.insert_menu(10, "Reports", None, 4, true);
        store.insert_menu(11, "Sales Report", Some(10), 1, true);

        store.relate(2, &[1, 2, 3]);
        store.relate(3, &[1, 5]);

        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn insert_company(&self, id: i32, name: &str, parent: Option<i32>) {
        let now = Utc::now();
        self.lock().companies.insert(
            CompanyId(id),
            Company {
                id: CompanyId(id),
                name: name.to_string(),
                parent_id: parent.map(CompanyId),
                currency: None,
                language: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn insert_role(&self, id: i32, name: &str) {
        self.lock().roles.insert(RoleId(id), name.to_string());
    }

    pub fn insert_account(&self, id: i32, username: &str, role_id: i32, company_id: i32) {
        self.lock().accounts.insert(
            AccountId(id),
            AccountRow {
                username: username.to_string(),
                password_hash: PLACEHOLDER_HASH.to_string(),
                role_id: RoleId(role_id),
                company_id: CompanyId(company_id),
                is_active: true,
            },
        );
    }

    pub fn insert_menu(&self, id: i32, name: &str, parent: Option<i32>, order_no: i32, is_active: bool) {
        self.lock().menus.insert(
            MenuId(id),
            Menu {
                id: MenuId(id),
                name: name.to_string(),
                path: None,
                icon: None,
                parent_id: parent.map(MenuId),
                order_no,
                is_active,
            },
        );
    }

    pub fn relate(&self, role_id: i32, menu_ids: &[i32]) {
        let mut state = self.lock();
        for &menu_id in menu_ids {
            state.relations.insert((RoleId(role_id), MenuId(menu_id)));
        }
    }

    pub fn password_hash(&self, id: i32) -> Option<String> {
        self.lock()
            .accounts
            .get(&AccountId(id))
            .map(|row| row.password_hash.clone())
    }

    /// Caller context for a seeded account, as the auth middleware builds it
    pub async fn caller(&self, id: i32) -> Caller {
        let account = self
            .get_account(AccountId(id))
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no account {}", id));
        Caller::from(&account)
    }

    /// Makes the next `replace_assignments` fail after the delete step
    pub fn fail_next_assignment(&self) {
        self.fail_assignments.store(true, Ordering::SeqCst);
    }

    pub fn relations_for(&self, role_id: i32) -> Vec<i32> {
        self.lock()
            .relations
            .iter()
            .filter(|(role, _)| *role == RoleId(role_id))
            .map(|(_, menu)| menu.get())
            .collect()
    }
}

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>, DatabaseError> {
        Ok(self.lock().companies.get(&id).cloned())
    }

    async fn list_companies(&self) -> Result<Vec<Company>, DatabaseError> {
        Ok(self.lock().companies.values().cloned().collect())
    }

    async fn create_company(&self, input: &CreateCompany) -> Result<Company, DatabaseError> {
        let mut state = self.lock();
        if let Some(parent) = input.parent_id {
            if !state.companies.contains_key(&parent) {
                return Err(DatabaseError::Constraint(format!("company {} does not exist", parent)));
            }
        }

        let next = state.companies.keys().next_back().map_or(1, |id| id.get() + 1);
        let now = Utc::now();
        let company = Company {
            id: CompanyId(next),
            name: input.name.clone(),
            parent_id: input.parent_id,
            currency: input.currency.clone(),
            language: input.language.clone(),
            created_at: now,
            updated_at: now,
        };
        state.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn update_company(
        &self,
        id: CompanyId,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, DatabaseError> {
        let mut state = self.lock();
        if let Some(Some(parent)) = input.parent_id {
            if !state.companies.contains_key(&parent) {
                return Err(DatabaseError::Constraint(format!("company {} does not exist", parent)));
            }
        }

        let Some(company) = state.companies.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            company.name = name.clone();
        }
        if let Some(currency) = &input.currency {
            company.currency = Some(currency.clone());
        }
        if let Some(language) = &input.language {
            company.language = Some(language.clone());
        }
        if let Some(parent) = input.parent_id {
            company.parent_id = parent;
        }
        company.updated_at = Utc::now();
        Ok(Some(company.clone()))
    }

    async fn delete_company(&self, id: CompanyId) -> Result<bool, DatabaseError> {
        let mut state = self.lock();
        let referenced = state.companies.values().any(|c| c.parent_id == Some(id))
            || state.accounts.values().any(|a| a.company_id == id);
        if referenced {
            return Err(DatabaseError::Constraint(format!("company {} is still referenced", id)));
        }
        Ok(state.companies.remove(&id).is_some())
    }

    async fn count_child_companies(&self, id: CompanyId) -> Result<i64, DatabaseError> {
        let state = self.lock();
        Ok(state.companies.values().filter(|c| c.parent_id == Some(id)).count() as i64)
    }

    async fn count_company_accounts(&self, id: CompanyId) -> Result<i64, DatabaseError> {
        let state = self.lock();
        Ok(state.accounts.values().filter(|a| a.company_id == id).count() as i64)
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn get_role_id_by_name(&self, name: &str) -> Result<Option<RoleId>, DatabaseError> {
        let state = self.lock();
        Ok(state
            .roles
            .iter()
            .find(|(_, role)| role.as_str() == name)
            .map(|(id, _)| *id))
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DatabaseError> {
        Ok(self.lock().roles.get(&id).map(|name| Role {
            id,
            name: name.clone(),
        }))
    }

    async fn list_roles(&self) -> Result<Vec<Role>, DatabaseError> {
        Ok(self
            .lock()
            .roles
            .iter()
            .map(|(id, name)| Role {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl MenuRepository for MemoryStore {
    async fn get_menu(&self, id: MenuId) -> Result<Option<Menu>, DatabaseError> {
        Ok(self.lock().menus.get(&id).cloned())
    }

    async fn list_menus(&self) -> Result<Vec<Menu>, DatabaseError> {
        Ok(self.lock().menus.values().cloned().collect())
    }

    async fn list_active_menus_for_role(&self, role_id: RoleId) -> Result<Vec<Menu>, DatabaseError> {
        let state = self.lock();
        Ok(state
            .relations
            .iter()
            .filter(|(role, _)| *role == role_id)
            .filter_map(|(_, menu)| state.menus.get(menu))
            .filter(|menu| menu.is_active)
            .cloned()
            .collect())
    }

    async fn list_assigned_menu_ids(&self, role_id: RoleId) -> Result<Vec<MenuId>, DatabaseError> {
        let state = self.lock();
        Ok(state
            .relations
            .iter()
            .filter(|(role, _)| *role == role_id)
            .map(|(_, menu)| *menu)
            .collect())
    }

    async fn replace_assignments(
        &self,
        role_id: RoleId,
        menu_ids: &[MenuId],
    ) -> Result<(), DatabaseError> {
        let mut state = self.lock();

        // Stage on a copy; only a complete run replaces the live set
        let mut staged = state.relations.clone();
        staged.retain(|(role, _)| *role != role_id);

        if self.fail_assignments.swap(false, Ordering::SeqCst) {
            return Err(DatabaseError::QueryError("injected failure".to_string()));
        }

        for menu_id in menu_ids {
            if !state.menus.contains_key(menu_id) {
                return Err(DatabaseError::Constraint(format!("menu {} does not exist", menu_id)));
            }
            staged.insert((role_id, *menu_id));
        }

        state.relations = staged;
        Ok(())
    }

    async fn create_menu(&self, input: &CreateMenu) -> Result<Menu, DatabaseError> {
        let mut state = self.lock();
        if let Some(parent) = input.parent_id {
            if !state.menus.contains_key(&parent) {
                return Err(DatabaseError::Constraint(format!("menu {} does not exist", parent)));
            }
        }

        let next = state.menus.keys().next_back().map_or(1, |id| id.get() + 1);
        let menu = Menu {
            id: MenuId(next),
            name: input.name.clone(),
            path: input.path.clone(),
            icon: input.icon.clone(),
            parent_id: input.parent_id,
            order_no: input.order_no,
            is_active: input.is_active,
        };
        state.menus.insert(menu.id, menu.clone());
        Ok(menu)
    }

    async fn update_menu(&self, id: MenuId, input: &UpdateMenu) -> Result<Option<Menu>, DatabaseError> {
        let mut state = self.lock();
        if let Some(Some(parent)) = input.parent_id {
            if !state.menus.contains_key(&parent) {
                return Err(DatabaseError::Constraint(format!("menu {} does not exist", parent)));
            }
        }

        let Some(menu) = state.menus.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            menu.name = name.clone();
        }
        if let Some(path) = &input.path {
            menu.path = Some(path.clone());
        }
        if let Some(icon) = &input.icon {
            menu.icon = Some(icon.clone());
        }
        if let Some(parent) = input.parent_id {
            menu.parent_id = parent;
        }
        if let Some(order_no) = input.order_no {
            menu.order_no = order_no;
        }
        if let Some(is_active) = input.is_active {
            menu.is_active = is_active;
        }
        Ok(Some(menu.clone()))
    }

    async fn delete_menu(&self, id: MenuId) -> Result<bool, DatabaseError> {
        let mut state = self.lock();
        if state.menus.values().any(|m| m.parent_id == Some(id)) {
            return Err(DatabaseError::Constraint(format!("menu {} still has children", id)));
        }
        state.relations.retain(|(_, menu)| *menu != id);
        Ok(state.menus.remove(&id).is_some())
    }

    async fn count_child_menus(&self, id: MenuId) -> Result<i64, DatabaseError> {
        let state = self.lock();
        Ok(state.menus.values().filter(|m| m.parent_id == Some(id)).count() as i64)
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn list_accounts(
        &self,
        companies: Option<&BTreeSet<CompanyId>>,
    ) -> Result<Vec<Account>, DatabaseError> {
        let state = self.lock();
        Ok(state
            .accounts
            .iter()
            .filter(|(_, row)| companies.map_or(true, |ids| ids.contains(&row.company_id)))
            .map(|(id, row)| state.account(*id, row))
            .collect())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, DatabaseError> {
        let state = self.lock();
        Ok(state.accounts.get(&id).map(|row| state.account(id, row)))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<AccountCredentials>, DatabaseError> {
        let state = self.lock();
        Ok(state
            .accounts
            .iter()
            .find(|(_, row)| row.username == username)
            .map(|(id, row)| AccountCredentials {
                id: *id,
                username: row.username.clone(),
                password_hash: row.password_hash.clone(),
                role: state.roles.get(&row.role_id).cloned().unwrap_or_default(),
                company_id: row.company_id,
                is_active: row.is_active,
            }))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        Ok(self.lock().accounts.values().any(|row| row.username == username))
    }

    async fn create_account(&self, input: &NewAccount) -> Result<Account, DatabaseError> {
        let mut state = self.lock();
        if state.accounts.values().any(|row| row.username == input.username) {
            return Err(DatabaseError::Constraint(format!(
                "username {} already exists",
                input.username
            )));
        }
        state.check_account_refs(input.role_id, input.company_id)?;

        let next = state.accounts.keys().next_back().map_or(1, |id| id.get() + 1);
        let row = AccountRow {
            username: input.username.clone(),
            password_hash: input.password_hash.clone(),
            role_id: input.role_id,
            company_id: input.company_id,
            is_active: true,
        };
        let account = state.account(AccountId(next), &row);
        state.accounts.insert(AccountId(next), row);
        Ok(account)
    }

    async fn update_account(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<Option<Account>, DatabaseError> {
        let mut state = self.lock();
        let Some(mut row) = state.accounts.get(&id).cloned() else {
            return Ok(None);
        };

        if let Some(role_id) = changes.role_id {
            row.role_id = role_id;
        }
        if let Some(company_id) = changes.company_id {
            row.company_id = company_id;
        }
        if let Some(is_active) = changes.is_active {
            row.is_active = is_active;
        }
        state.check_account_refs(row.role_id, row.company_id)?;

        let account = state.account(id, &row);
        state.accounts.insert(id, row);
        Ok(Some(account))
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, DatabaseError> {
        Ok(self.lock().accounts.remove(&id).is_some())
    }

    async fn set_password_hash(&self, id: AccountId, hash: &str) -> Result<bool, DatabaseError> {
        let mut state = self.lock();
        match state.accounts.get_mut(&id) {
            Some(row) => {
                row.password_hash = hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
