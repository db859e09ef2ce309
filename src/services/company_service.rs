use crate::authz::{descendants, Action, AuthorizationScope, SUPERADMIN};
use crate::database::models::{Company, CreateCompany, UpdateCompany};
use crate::database::Store;
use crate::tree::{assemble, TreeItem};
use crate::types::{CompanyId, ROOT_COMPANY_ID};

use super::caller::Caller;
use super::error::{ServiceError, ServiceResult};

const MAX_NAME_LEN: usize = 100;

/// Company hierarchy management. Admin tiers only; a company admin works
/// within its own subtree and never creates or moves top-level companies.
pub struct CompanyService<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CompanyService<'a, S>
where
    S: Store + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Visible forest. A company admin's own company is rendered as a root
    /// because its parent is filtered out.
    pub async fn tree(&self, caller: &Caller) -> ServiceResult<Vec<TreeItem<Company>>> {
        let scope = caller.scope_for_action(self.store, Action::ViewCompanies).await?;
        let companies = self.store.list_companies().await?;
        let visible = companies.into_iter().filter(|c| scope.is_allowed(c.id));
        Ok(assemble(visible))
    }

    pub async fn get(&self, caller: &Caller, id: CompanyId) -> ServiceResult<Company> {
        let scope = caller.scope_for_action(self.store, Action::ViewCompanies).await?;
        let company = self.load(id).await?;
        caller.require_company(&scope, id)?;
        Ok(company)
    }

    pub async fn create(&self, caller: &Caller, input: CreateCompany) -> ServiceResult<Company> {
        let input = CreateCompany {
            name: validate_name(&input.name)?.to_string(),
            currency: normalize(input.currency),
            language: normalize(input.language),
            ..input
        };

        let scope = caller.scope_for_action(self.store, Action::ManageCompanies).await?;
        match input.parent_id {
            Some(parent) => {
                caller.require_company(&scope, parent)?;
                self.load(parent).await?;
            }
            None => require_unbounded(caller, &scope, "create top-level companies")?,
        }

        let company = self.store.create_company(&input).await?;
        tracing::info!(
            "Company {} ('{}') created under {:?} by '{}'",
            company.id,
            company.name,
            company.parent_id,
            caller.username
        );
        Ok(company)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: CompanyId,
        input: UpdateCompany,
    ) -> ServiceResult<Company> {
        if input.name.is_none()
            && input.parent_id.is_none()
            && input.currency.is_none()
            && input.language.is_none()
        {
            return Err(ServiceError::validation("body", "No changes supplied"));
        }
        let name = input
            .name
            .as_deref()
            .map(validate_name)
            .transpose()?
            .map(str::to_string);

        if id == ROOT_COMPANY_ID && input.parent_id.is_some() {
            tracing::warn!("Refused: '{}' tried to move the root company", caller.username);
            return Err(ServiceError::Forbidden(format!(
                "Company {} is the root company and cannot be moved",
                id
            )));
        }

        let scope = caller.scope_for_action(self.store, Action::ManageCompanies).await?;
        self.load(id).await?;
        caller.require_company(&scope, id)?;

        match input.parent_id {
            Some(Some(parent)) => {
                caller.require_company(&scope, parent)?;
                self.load(parent).await?;
                self.reject_cycle(id, parent).await?;
            }
            Some(None) => require_unbounded(caller, &scope, "move companies to the top level")?,
            None => {}
        }

        let changes = UpdateCompany {
            name,
            currency: normalize(input.currency),
            language: normalize(input.language),
            ..input
        };
        let company = self
            .store
            .update_company(id, &changes)
            .await?
            .ok_or_else(|| company_not_found(id))?;

        tracing::info!("Company {} updated by '{}'", id, caller.username);
        Ok(company)
    }

    /// Blocked while the company still has sub-companies or accounts
    pub async fn delete(&self, caller: &Caller, id: CompanyId) -> ServiceResult<()> {
        if id == ROOT_COMPANY_ID {
            tracing::warn!("Refused: '{}' tried to delete the root company", caller.username);
            return Err(ServiceError::Forbidden(format!(
                "Company {} is the root company and cannot be deleted",
                id
            )));
        }

        let scope = caller.scope_for_action(self.store, Action::ManageCompanies).await?;
        self.load(id).await?;
        caller.require_company(&scope, id)?;

        let children = self.store.count_child_companies(id).await?;
        if children > 0 {
            return Err(ServiceError::Conflict(format!(
                "Company {} still has {} sub-companies",
                id, children
            )));
        }
        let accounts = self.store.count_company_accounts(id).await?;
        if accounts > 0 {
            return Err(ServiceError::Conflict(format!(
                "Company {} still has {} accounts",
                id, accounts
            )));
        }

        if !self.store.delete_company(id).await? {
            return Err(company_not_found(id));
        }
        tracing::info!("Company {} deleted by '{}'", id, caller.username);
        Ok(())
    }

    async fn load(&self, id: CompanyId) -> ServiceResult<Company> {
        self.store
            .get_company(id)
            .await?
            .ok_or_else(|| company_not_found(id))
    }

    async fn reject_cycle(&self, id: CompanyId, new_parent: CompanyId) -> ServiceResult<()> {
        let companies = self.store.list_companies().await?;
        if descendants(&companies, id).contains(&new_parent) {
            return Err(ServiceError::Conflict(format!(
                "Company {} cannot be moved under its own sub-company {}",
                id, new_parent
            )));
        }
        Ok(())
    }
}

fn require_unbounded(caller: &Caller, scope: &AuthorizationScope, what: &str) -> ServiceResult<()> {
    if scope.is_unbounded() {
        return Ok(());
    }
    tracing::warn!("Denied: '{}' (role '{}') tried to {}", caller.username, caller.role, what);
    Err(ServiceError::Forbidden(format!("Only a {} may {}", SUPERADMIN, what)))
}

fn company_not_found(id: CompanyId) -> ServiceError {
    ServiceError::NotFound(format!("Company {} not found", id))
}

fn validate_name(raw: &str) -> ServiceResult<&str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("name", "Company name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::validation(
            "name",
            format!("Company name must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(name)
}

/// Blank strings are stored as absent
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
