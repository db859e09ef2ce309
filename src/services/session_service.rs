use serde::{Deserialize, Serialize};

use crate::auth::{generate_jwt, verify_password, Claims, TokenSettings};
use crate::authz::AuthorizationScope;
use crate::database::Store;
use crate::types::{AccountId, CompanyId};

use super::caller::Caller;
use super::error::{ServiceError, ServiceResult};

const BAD_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhoAmI {
    pub id: AccountId,
    pub username: String,
    pub role: String,
    pub company_id: CompanyId,
    pub scope: AuthorizationScope,
}

pub struct SessionService<'a, S: ?Sized> {
    store: &'a S,
    tokens: &'a TokenSettings,
}

impl<'a, S> SessionService<'a, S>
where
    S: Store + ?Sized,
{
    pub fn new(store: &'a S, tokens: &'a TokenSettings) -> Self {
        Self { store, tokens }
    }

    /// Exchange credentials for a signed token. Unknown users, inactive
    /// accounts and wrong passwords share one message.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<LoginResponse> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(ServiceError::validation("username", "Username is required"));
        }
        if request.password.is_empty() {
            return Err(ServiceError::validation("password", "Password is required"));
        }

        let credentials = match self.store.find_credentials(username).await? {
            Some(c) if c.is_active => c,
            Some(_) => {
                tracing::warn!("Login refused for inactive account '{}'", username);
                return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
            }
            None => {
                tracing::warn!("Login attempt for unknown account '{}'", username);
                return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(&credentials.password_hash, &request.password) {
            tracing::warn!("Login failed for '{}': wrong password", username);
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let claims = Claims::new(
            credentials.id,
            credentials.username.clone(),
            credentials.role.clone(),
            credentials.company_id,
            self.tokens.expiry_hours,
        );
        let token = generate_jwt(&claims, &self.tokens.secret)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        tracing::info!("Account {} ('{}') logged in", credentials.id, credentials.username);
        Ok(LoginResponse {
            token,
            role: credentials.role,
            expires_in: self.tokens.expires_in_seconds(),
        })
    }

    pub async fn whoami(&self, caller: &Caller) -> ServiceResult<WhoAmI> {
        let scope = caller.scope(self.store).await?;
        Ok(WhoAmI {
            id: caller.account_id,
            username: caller.username.clone(),
            role: caller.role.clone(),
            company_id: caller.company_id,
            scope,
        })
    }
}
