use serde::Serialize;
use std::collections::BTreeSet;

use crate::database::models::company::Company;
use crate::database::repository::CompanyRepository;
use crate::database::DatabaseError;
use crate::types::CompanyId;

use super::descendants::descendants;

pub const SUPERADMIN: &str = "superadmin";
pub const COMPANY_ADMIN: &str = "company_admin";

/// Administrative tier of a role name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    SuperAdmin,
    CompanyAdmin,
    Plain,
}

impl RoleKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            SUPERADMIN => RoleKind::SuperAdmin,
            COMPANY_ADMIN => RoleKind::CompanyAdmin,
            _ => RoleKind::Plain,
        }
    }

    pub fn is_admin(self) -> bool {
        !matches!(self, RoleKind::Plain)
    }
}

/// Operations gated by the scope evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListAccounts,
    CreateAccount,
    UpdateAccount,
    DeleteAccount,
    ResetPassword,
    ViewCompanies,
    ManageCompanies,
    ManageMenus,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::ListAccounts => "list accounts",
            Action::CreateAccount => "create accounts",
            Action::UpdateAccount => "update accounts",
            Action::DeleteAccount => "delete accounts",
            Action::ResetPassword => "reset passwords",
            Action::ViewCompanies => "view companies",
            Action::ManageCompanies => "manage companies",
            Action::ManageMenus => "manage menus",
        }
    }
}

/// Companies a caller may act upon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "company_ids", rename_all = "snake_case")]
pub enum AllowedCompanies {
    /// Unbounded; never materialized as a set
    All,
    Only(BTreeSet<CompanyId>),
}

/// Per-request authorization decision input. Never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationScope {
    pub role: RoleKind,
    pub companies: AllowedCompanies,
}

impl AuthorizationScope {
    pub fn unbounded() -> Self {
        Self {
            role: RoleKind::SuperAdmin,
            companies: AllowedCompanies::All,
        }
    }

    pub fn within(role: RoleKind, company_ids: BTreeSet<CompanyId>) -> Self {
        Self {
            role,
            companies: AllowedCompanies::Only(company_ids),
        }
    }

    pub fn empty(role: RoleKind) -> Self {
        Self::within(role, BTreeSet::new())
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self.companies, AllowedCompanies::All)
    }

    pub fn is_allowed(&self, target: CompanyId) -> bool {
        match &self.companies {
            AllowedCompanies::All => true,
            AllowedCompanies::Only(ids) => ids.contains(&target),
        }
    }

    /// `None` means no company filter applies
    pub fn company_filter(&self) -> Option<&BTreeSet<CompanyId>> {
        match &self.companies {
            AllowedCompanies::All => None,
            AllowedCompanies::Only(ids) => Some(ids),
        }
    }

    pub fn permits(&self, action: Action) -> bool {
        match self.role {
            RoleKind::SuperAdmin => true,
            RoleKind::CompanyAdmin => !matches!(action, Action::ManageMenus),
            RoleKind::Plain => false,
        }
    }
}

/// Resolves a caller's (role, company) into an [`AuthorizationScope`]
/// from the current company tree.
pub struct ScopeEvaluator<'a, S: ?Sized> {
    companies: &'a S,
}

impl<'a, S> ScopeEvaluator<'a, S>
where
    S: CompanyRepository + ?Sized,
{
    pub fn new(companies: &'a S) -> Self {
        Self { companies }
    }

    pub async fn scope_for(
        &self,
        role: &str,
        company_id: CompanyId,
    ) -> Result<AuthorizationScope, DatabaseError> {
        let scope = match RoleKind::from_name(role) {
            RoleKind::SuperAdmin => AuthorizationScope::unbounded(),
            RoleKind::CompanyAdmin => {
                let ids = self.descendants_of(company_id).await?;
                AuthorizationScope::within(RoleKind::CompanyAdmin, ids)
            }
            RoleKind::Plain => AuthorizationScope::empty(RoleKind::Plain),
        };

        tracing::debug!(
            "Resolved scope for role '{}' at company {}: {:?}",
            role,
            company_id,
            scope.companies
        );
        Ok(scope)
    }

    /// Closure {company ∪ all sub-companies}, read fresh from the store
    pub async fn descendants_of(
        &self,
        company_id: CompanyId,
    ) -> Result<BTreeSet<CompanyId>, DatabaseError> {
        let companies: Vec<Company> = self.companies.list_companies().await?;
        Ok(descendants(&companies, company_id))
    }
}
