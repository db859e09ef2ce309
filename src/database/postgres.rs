use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeSet;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Account, AccountChanges, AccountCredentials, Company, CreateCompany, CreateMenu, Menu,
    NewAccount, Role, UpdateCompany, UpdateMenu,
};
use crate::database::repository::{
    AccountRepository, CompanyRepository, MenuRepository, RoleRepository,
};
use crate::types::{AccountId, CompanyId, MenuId, RoleId};

const COMPANY_COLUMNS: &str = "id, name, parent_id, currency, language, created_at, updated_at";
const MENU_COLUMNS: &str = "id, name, path, icon, parent_id, order_no, is_active";

const ACCOUNT_SELECT: &str = r#"
    SELECT u.id, u.username, u.role_id, r.name AS role, u.company_id, u.is_active
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

/// PostgreSQL-backed store over the `companies`, `menus`,
/// `role_menu_relations`, `users` and `roles` tables
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PgStore {
    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>, DatabaseError> {
        let sql = format!("SELECT {} FROM companies WHERE id = $1", COMPANY_COLUMNS);
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    async fn list_companies(&self) -> Result<Vec<Company>, DatabaseError> {
        let sql = format!("SELECT {} FROM companies ORDER BY id", COMPANY_COLUMNS);
        let companies = sqlx::query_as::<_, Company>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(companies)
    }

    async fn create_company(&self, input: &CreateCompany) -> Result<Company, DatabaseError> {
        let sql = format!(
            "INSERT INTO companies (name, parent_id, currency, language)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            COMPANY_COLUMNS
        );
        sqlx::query_as::<_, Company>(&sql)
            .bind(&input.name)
            .bind(input.parent_id)
            .bind(&input.currency)
            .bind(&input.language)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_write)
    }

    async fn update_company(
        &self,
        id: CompanyId,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, DatabaseError> {
        let sql = format!(
            "UPDATE companies SET
                name = COALESCE($2, name),
                currency = COALESCE($3, currency),
                language = COALESCE($4, language),
                parent_id = CASE WHEN $5 THEN $6 ELSE parent_id END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            COMPANY_COLUMNS
        );
        sqlx::query_as::<_, Company>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.currency)
            .bind(&input.language)
            .bind(input.parent_id.is_some())
            .bind(input.parent_id.flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_write)
    }

    async fn delete_company(&self, id: CompanyId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_write)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_child_companies(&self, id: CompanyId) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_company_accounts(&self, id: CompanyId) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE company_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RoleRepository for PgStore {
    async fn get_role_id_by_name(&self, name: &str) -> Result<Option<RoleId>, DatabaseError> {
        let id = sqlx::query_scalar::<_, RoleId>("SELECT id FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, DatabaseError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, DatabaseError> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }
}

#[async_trait]
impl MenuRepository for PgStore {
    async fn get_menu(&self, id: MenuId) -> Result<Option<Menu>, DatabaseError> {
        let sql = format!("SELECT {} FROM menus WHERE id = $1", MENU_COLUMNS);
        let menu = sqlx::query_as::<_, Menu>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(menu)
    }

    async fn list_menus(&self) -> Result<Vec<Menu>, DatabaseError> {
        let sql = format!("SELECT {} FROM menus ORDER BY order_no, id", MENU_COLUMNS);
        let menus = sqlx::query_as::<_, Menu>(&sql).fetch_all(&self.pool).await?;
        Ok(menus)
    }

    async fn list_active_menus_for_role(&self, role_id: RoleId) -> Result<Vec<Menu>, DatabaseError> {
        let menus = sqlx::query_as::<_, Menu>(
            r#"
            SELECT m.id, m.name, m.path, m.icon, m.parent_id, m.order_no, m.is_active
            FROM menus m
            JOIN role_menu_relations rm ON rm.menu_id = m.id
            WHERE rm.role_id = $1
            AND m.is_active = true
            ORDER BY m.order_no, m.id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(menus)
    }

    async fn list_assigned_menu_ids(&self, role_id: RoleId) -> Result<Vec<MenuId>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, MenuId>(
            "SELECT menu_id FROM role_menu_relations WHERE role_id = $1 ORDER BY menu_id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn replace_assignments(
        &self,
        role_id: RoleId,
        menu_ids: &[MenuId],
    ) -> Result<(), DatabaseError> {
        let raw: Vec<i32> = menu_ids.iter().map(|id| id.get()).collect();

        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_menu_relations WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        if !raw.is_empty() {
            sqlx::query(
                "INSERT INTO role_menu_relations (role_id, menu_id) SELECT $1, UNNEST($2::int[])",
            )
            .bind(role_id)
            .bind(raw)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_write)?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn create_menu(&self, input: &CreateMenu) -> Result<Menu, DatabaseError> {
        let sql = format!(
            "INSERT INTO menus (name, path, icon, parent_id, order_no, is_active)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            MENU_COLUMNS
        );
        sqlx::query_as::<_, Menu>(&sql)
            .bind(&input.name)
            .bind(&input.path)
            .bind(&input.icon)
            .bind(input.parent_id)
            .bind(input.order_no)
            .bind(input.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_write)
    }

    async fn update_menu(&self, id: MenuId, input: &UpdateMenu) -> Result<Option<Menu>, DatabaseError> {
        let sql = format!(
            "UPDATE menus SET
                name = COALESCE($2, name),
                path = COALESCE($3, path),
                icon = COALESCE($4, icon),
                parent_id = CASE WHEN $5 THEN $6 ELSE parent_id END,
                order_no = COALESCE($7, order_no),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {}",
            MENU_COLUMNS
        );
        sqlx::query_as::<_, Menu>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.path)
            .bind(&input.icon)
            .bind(input.parent_id.is_some())
            .bind(input.parent_id.flatten())
            .bind(input.order_no)
            .bind(input.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_write)
    }

    async fn delete_menu(&self, id: MenuId) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_menu_relations WHERE menu_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_write)?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_child_menus(&self, id: MenuId) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM menus WHERE parent_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn list_accounts(
        &self,
        companies: Option<&BTreeSet<CompanyId>>,
    ) -> Result<Vec<Account>, DatabaseError> {
        let accounts = match companies {
            None => {
                let sql = format!("{} ORDER BY u.id", ACCOUNT_SELECT);
                sqlx::query_as::<_, Account>(&sql).fetch_all(&self.pool).await?
            }
            Some(ids) if ids.is_empty() => Vec::new(),
            Some(ids) => {
                let raw: Vec<i32> = ids.iter().map(|id| id.get()).collect();
                let sql = format!("{} WHERE u.company_id = ANY($1) ORDER BY u.id", ACCOUNT_SELECT);
                sqlx::query_as::<_, Account>(&sql)
                    .bind(raw)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(accounts)
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("{} WHERE u.id = $1", ACCOUNT_SELECT);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<AccountCredentials>, DatabaseError> {
        let credentials = sqlx::query_as::<_, AccountCredentials>(
            r#"
            SELECT u.id, u.username, u.password_hash, r.name AS role, u.company_id, u.is_active
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credentials)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create_account(&self, input: &NewAccount) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>(
            r#"
            WITH inserted AS (
                INSERT INTO users (username, password_hash, role_id, company_id, is_active)
                VALUES ($1, $2, $3, $4, true)
                RETURNING id, username, role_id, company_id, is_active
            )
            SELECT i.id, i.username, i.role_id, r.name AS role, i.company_id, i.is_active
            FROM inserted i
            JOIN roles r ON r.id = i.role_id
            "#,
        )
        .bind(&input.username)
        .bind(&input.password_hash)
        .bind(input.role_id)
        .bind(input.company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_write)
    }

    async fn update_account(
        &self,
        id: AccountId,
        changes: &AccountChanges,
    ) -> Result<Option<Account>, DatabaseError> {
        sqlx::query_as::<_, Account>(
            r#"
            WITH updated AS (
                UPDATE users SET
                    role_id = COALESCE($2, role_id),
                    company_id = COALESCE($3, company_id),
                    is_active = COALESCE($4, is_active)
                WHERE id = $1
                RETURNING id, username, role_id, company_id, is_active
            )
            SELECT u.id, u.username, u.role_id, r.name AS role, u.company_id, u.is_active
            FROM updated u
            JOIN roles r ON r.id = u.role_id
            "#,
        )
        .bind(id)
        .bind(changes.role_id)
        .bind(changes.company_id)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_write)
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_write)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_password_hash(&self, id: AccountId, hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
