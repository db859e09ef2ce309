use serde::Deserialize;

use crate::auth::{hash_password, PasswordError};
use crate::authz::{Action, RoleKind, SUPERADMIN};
use crate::database::models::{Account, AccountChanges, NewAccount};
use crate::database::Store;
use crate::types::{AccountId, CompanyId, RoleId, PROTECTED_ACCOUNT_ID};

use super::caller::Caller;
use super::error::{ServiceError, ServiceResult};

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub role: String,
    /// Defaults to the caller's own company
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateAccountRequest {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.company_id.is_none() && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Account directory. Every read and write passes through the caller's
/// freshly evaluated scope before storage is touched.
pub struct AccountService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> AccountService<'a, S>
where
    S: Store + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn list(&self, caller: &Caller) -> ServiceResult<Vec<Account>> {
        let scope = caller.scope_for_action(self.store, Action::ListAccounts).await?;
        let accounts = self.store.list_accounts(scope.company_filter()).await?;
        Ok(accounts)
    }

    pub async fn create(&self, caller: &Caller, input: CreateAccountRequest) -> ServiceResult<Account> {
        let username = validate_username(&input.username)?;
        validate_password(&input.password)?;
        let role = validate_role_name(&input.role)?;

        let scope = caller.scope_for_action(self.store, Action::CreateAccount).await?;
        let company_id = input.company_id.unwrap_or(caller.company_id);
        caller.require_company(&scope, company_id)?;
        self.guard_escalation(caller, role)?;

        let role_id = self.resolve_role(role).await?;
        self.ensure_company(company_id).await?;

        if self.store.username_exists(username).await? {
            return Err(ServiceError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let password_hash = hash(&input.password)?;
        let account = self
            .store
            .create_account(&NewAccount {
                username: username.to_string(),
                password_hash,
                role_id,
                company_id,
            })
            .await?;

        tracing::info!(
            "Account {} ('{}') created in company {} by '{}'",
            account.id,
            account.username,
            account.company_id,
            caller.username
        );
        Ok(account)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: AccountId,
        input: UpdateAccountRequest,
    ) -> ServiceResult<Account> {
        if input.is_empty() {
            return Err(ServiceError::validation("body", "No changes supplied"));
        }
        let role = input.role.as_deref().map(validate_role_name).transpose()?;
        guard_protected(id, "modified")?;

        let scope = caller.scope_for_action(self.store, Action::UpdateAccount).await?;
        let target = self.load_target(caller, id).await?;
        caller.require_company(&scope, target.company_id)?;

        if let Some(company_id) = input.company_id {
            caller.require_company(&scope, company_id)?;
            self.ensure_company(company_id).await?;
        }

        let role_id = match role {
            Some(name) => {
                self.guard_escalation(caller, name)?;
                Some(self.resolve_role(name).await?)
            }
            None => None,
        };

        let changes = AccountChanges {
            role_id,
            company_id: input.company_id,
            is_active: input.is_active,
        };
        let account = self
            .store
            .update_account(id, &changes)
            .await?
            .ok_or_else(|| account_not_found(id))?;

        tracing::info!("Account {} updated by '{}': {:?}", id, caller.username, changes);
        Ok(account)
    }

    pub async fn delete(&self, caller: &Caller, id: AccountId) -> ServiceResult<()> {
        guard_protected(id, "deleted")?;

        let scope = caller.scope_for_action(self.store, Action::DeleteAccount).await?;
        let target = self.load_target(caller, id).await?;
        caller.require_company(&scope, target.company_id)?;

        if !self.store.delete_account(id).await? {
            return Err(account_not_found(id));
        }

        tracing::info!("Account {} ('{}') deleted by '{}'", id, target.username, caller.username);
        Ok(())
    }

    pub async fn reset_password(
        &self,
        caller: &Caller,
        id: AccountId,
        input: ResetPasswordRequest,
    ) -> ServiceResult<()> {
        validate_password(&input.password)?;
        guard_protected(id, "modified")?;

        let scope = caller.scope_for_action(self.store, Action::ResetPassword).await?;
        let target = self.load_target(caller, id).await?;
        caller.require_company(&scope, target.company_id)?;

        let password_hash = hash(&input.password)?;
        if !self.store.set_password_hash(id, &password_hash).await? {
            return Err(account_not_found(id));
        }

        tracing::info!("Password for account {} reset by '{}'", id, caller.username);
        Ok(())
    }

    /// Existing account that the caller's tier may act upon
    async fn load_target(&self, caller: &Caller, id: AccountId) -> ServiceResult<Account> {
        let target = self
            .store
            .get_account(id)
            .await?
            .ok_or_else(|| account_not_found(id))?;

        if RoleKind::from_name(&target.role) == RoleKind::SuperAdmin
            && caller.kind() != RoleKind::SuperAdmin
        {
            tracing::warn!("Denied: '{}' tried to manage superadmin account {}", caller.username, id);
            return Err(ServiceError::Forbidden(
                "Only a superadmin may manage superadmin accounts".to_string(),
            ));
        }
        Ok(target)
    }

    fn guard_escalation(&self, caller: &Caller, role: &str) -> ServiceResult<()> {
        if role == SUPERADMIN && caller.kind() != RoleKind::SuperAdmin {
            tracing::warn!("Denied: '{}' tried to grant the superadmin role", caller.username);
            return Err(ServiceError::Forbidden(
                "Only a superadmin may grant the superadmin role".to_string(),
            ));
        }
        Ok(())
    }

    async fn resolve_role(&self, name: &str) -> ServiceResult<RoleId> {
        self.store
            .get_role_id_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role '{}' not found", name)))
    }

    async fn ensure_company(&self, id: CompanyId) -> ServiceResult<()> {
        match self.store.get_company(id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!("Company {} not found", id))),
        }
    }
}

fn guard_protected(id: AccountId, verb: &str) -> ServiceResult<()> {
    if id == PROTECTED_ACCOUNT_ID {
        tracing::warn!("Refused: protected account {} cannot be {}", id, verb);
        return Err(ServiceError::Forbidden(format!(
            "Account {} is protected and cannot be {}",
            id, verb
        )));
    }
    Ok(())
}

fn account_not_found(id: AccountId) -> ServiceError {
    ServiceError::NotFound(format!("Account {} not found", id))
}

fn hash(password: &str) -> ServiceResult<String> {
    hash_password(password).map_err(|e: PasswordError| ServiceError::Internal(e.to_string()))
}

fn validate_username(raw: &str) -> ServiceResult<&str> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(ServiceError::validation("username", "Username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ServiceError::validation(
            "username",
            format!("Username must be at most {} characters", MAX_USERNAME_LEN),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ServiceError::validation(
            "username",
            "Username can only contain letters, numbers, '.', '-' and '_'",
        ));
    }
    Ok(username)
}

pub(crate) fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

fn validate_role_name(raw: &str) -> ServiceResult<&str> {
    let role = raw.trim();
    if role.is_empty() {
        return Err(ServiceError::validation("role", "Role is required"));
    }
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::database::AccountRepository;
    use crate::testing::MemoryStore;

    fn create_request(username: &str, role: &str, company: Option<i32>) -> CreateAccountRequest {
        CreateAccountRequest {
            username: username.to_string(),
            password: "s3cret-pass".to_string(),
            role: role.to_string(),
            company_id: company.map(CompanyId),
        }
    }

    fn ids(accounts: &[Account]) -> Vec<i32> {
        accounts.iter().map(|a| a.id.get()).collect()
    }

    #[tokio::test]
    async fn list_is_scoped_to_company_subtree() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);

        let all = service.list(&store.caller(1).await).await.unwrap();
        assert_eq!(ids(&all), vec![1, 2, 3, 4, 5]);

        let asia = service.list(&store.caller(2).await).await.unwrap();
        assert_eq!(ids(&asia), vec![2, 3, 5]);

        let europe = service.list(&store.caller(4).await).await.unwrap();
        assert_eq!(ids(&europe), vec![4]);
    }

    #[tokio::test]
    async fn plain_role_cannot_list() {
        let store = MemoryStore::seeded();
        let err = AccountService::new(&store)
            .list(&store.caller(3).await)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn protected_account_is_never_deleted() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);

        for caller in [1, 2, 3] {
            let err = service
                .delete(&store.caller(caller).await, AccountId(1))
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
        assert!(store.get_account(AccountId(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn protected_account_is_never_modified() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);
        let admin = store.caller(1).await;

        let update = UpdateAccountRequest {
            is_active: Some(false),
            ..Default::default()
        };
        let err = service.update(&admin, AccountId(1), update).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let reset = ResetPasswordRequest {
            password: "another-pass".to_string(),
        };
        let err = service.reset_password(&admin, AccountId(1), reset).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(store.get_account(AccountId(1)).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn delete_outside_scope_is_forbidden_without_side_effect() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);
        let asia_admin = store.caller(2).await;

        let err = service.delete(&asia_admin, AccountId(4)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(store.get_account(AccountId(4)).await.unwrap().is_some());

        service.delete(&asia_admin, AccountId(5)).await.unwrap();
        assert!(store.get_account(AccountId(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let store = MemoryStore::seeded();
        let err = AccountService::new(&store)
            .delete(&store.caller(1).await, AccountId(99))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn company_admin_creates_inside_scope_only() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);
        let asia_admin = store.caller(2).await;

        let created = service
            .create(&asia_admin, create_request("taipei_new", "sales", Some(3)))
            .await
            .unwrap();
        assert_eq!(created.company_id, CompanyId(3));
        assert_eq!(created.role, "sales");

        let err = service
            .create(&asia_admin, create_request("europe_new", "sales", Some(4)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(!store.username_exists("europe_new").await.unwrap());
    }

    #[tokio::test]
    async fn create_defaults_to_caller_company() {
        let store = MemoryStore::seeded();
        let created = AccountService::new(&store)
            .create(&store.caller(4).await, create_request("paris", "sales", None))
            .await
            .unwrap();
        assert_eq!(created.company_id, CompanyId(4));
    }

    #[tokio::test]
    async fn company_admin_cannot_grant_superadmin() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);
        let asia_admin = store.caller(2).await;

        let err = service
            .create(&asia_admin, create_request("sneaky", SUPERADMIN, Some(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let promote = UpdateAccountRequest {
            role: Some(SUPERADMIN.to_string()),
            ..Default::default()
        };
        let err = service.update(&asia_admin, AccountId(3), promote).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert_eq!(store.get_account(AccountId(3)).await.unwrap().unwrap().role, "sales");
    }

    #[tokio::test]
    async fn company_admin_cannot_touch_superadmin_accounts() {
        let store = MemoryStore::seeded();
        store.insert_account(6, "taipei_root", 1, 3);

        let err = AccountService::new(&store)
            .delete(&store.caller(2).await, AccountId(6))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::seeded();
        let err = AccountService::new(&store)
            .create(&store.caller(1).await, create_request("taipei_sales", "sales", Some(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_scope() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);
        // A plain role would be Forbidden, so Validation proves the order
        let sales = store.caller(3).await;

        let err = service
            .create(&sales, create_request("  ", "sales", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "username", .. }));

        let mut short = create_request("shorty", "sales", None);
        short.password = "abc".to_string();
        let err = service.create(&sales, short).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation { field: "password", .. }));

        let err = service
            .update(&sales, AccountId(5), UpdateAccountRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[test]
    fn update_request_emptiness() {
        let empty: UpdateAccountRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());

        let deactivate: UpdateAccountRequest =
            serde_json::from_str(r#"{"is_active": false}"#).unwrap();
        assert!(!deactivate.is_empty());
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let store = MemoryStore::seeded();
        let err = AccountService::new(&store)
            .create(&store.caller(1).await, create_request("ghost", "wizard", Some(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn moving_account_requires_both_companies_in_scope() {
        let store = MemoryStore::seeded();
        let service = AccountService::new(&store);
        let move_to_europe = UpdateAccountRequest {
            company_id: Some(CompanyId(4)),
            ..Default::default()
        };

        let err = service
            .update(&store.caller(2).await, AccountId(3), move_to_europe.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let moved = service
            .update(&store.caller(1).await, AccountId(3), move_to_europe)
            .await
            .unwrap();
        assert_eq!(moved.company_id, CompanyId(4));
    }

    #[tokio::test]
    async fn reset_password_stores_new_hash() {
        let store = MemoryStore::seeded();
        AccountService::new(&store)
            .reset_password(
                &store.caller(2).await,
                AccountId(3),
                ResetPasswordRequest {
                    password: "fresh-password".to_string(),
                },
            )
            .await
            .unwrap();

        let hash = store.password_hash(3).unwrap();
        assert!(verify_password(&hash, "fresh-password"));
    }
}
