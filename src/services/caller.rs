use serde::Serialize;

use crate::authz::{Action, AuthorizationScope, RoleKind, ScopeEvaluator};
use crate::database::models::Account;
use crate::database::CompanyRepository;
use crate::types::{AccountId, CompanyId, RoleId};

use super::error::{ServiceError, ServiceResult};

/// The authenticated account behind a request, as currently stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub account_id: AccountId,
    pub username: String,
    pub role_id: RoleId,
    pub role: String,
    pub company_id: CompanyId,
}

impl Caller {
    pub fn kind(&self) -> RoleKind {
        RoleKind::from_name(&self.role)
    }

    /// Fresh scope for this request
    pub async fn scope<S>(&self, companies: &S) -> ServiceResult<AuthorizationScope>
    where
        S: CompanyRepository + ?Sized,
    {
        let scope = ScopeEvaluator::new(companies)
            .scope_for(&self.role, self.company_id)
            .await?;
        Ok(scope)
    }

    /// Scope that is known to permit `action`
    pub async fn scope_for_action<S>(
        &self,
        companies: &S,
        action: Action,
    ) -> ServiceResult<AuthorizationScope>
    where
        S: CompanyRepository + ?Sized,
    {
        let scope = self.scope(companies).await?;
        self.require(&scope, action)?;
        Ok(scope)
    }

    pub fn require(&self, scope: &AuthorizationScope, action: Action) -> ServiceResult<()> {
        if scope.permits(action) {
            return Ok(());
        }
        tracing::warn!(
            "Denied: '{}' (role '{}') may not {}",
            self.username,
            self.role,
            action.name()
        );
        Err(ServiceError::Forbidden(format!(
            "Role '{}' may not {}",
            self.role,
            action.name()
        )))
    }

    /// Target company must sit inside the caller's scope
    pub fn require_company(&self, scope: &AuthorizationScope, target: CompanyId) -> ServiceResult<()> {
        if scope.is_allowed(target) {
            return Ok(());
        }
        tracing::warn!(
            "Denied: '{}' acted on company {} outside its scope",
            self.username,
            target
        );
        Err(ServiceError::Forbidden(format!(
            "Company {} is outside your scope",
            target
        )))
    }
}

impl From<&Account> for Caller {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            username: account.username.clone(),
            role_id: account.role_id,
            role: account.role.clone(),
            company_id: account.company_id,
        }
    }
}
