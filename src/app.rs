// app.rs - Router assembly
//
// Public routes need no token. Everything under the protected router passes
// jwt_auth_middleware first, then validate_user_middleware, which reloads the
// account and injects the `Caller`.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::TokenSettings;
use crate::database::{DatabaseManager, Store};
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenSettings>,
    /// Present when backed by PostgreSQL; used by the health check
    pub database: Option<DatabaseManager>,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenSettings, body_limit: usize) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            database: None,
            body_limit,
        }
    }

    pub fn with_database(mut self, database: DatabaseManager) -> Self {
        self.database = Some(database);
        self
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.body_limit;

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/login", post(public::login_post))
        // Protected
        .merge(protected_routes(state.clone()))
        .fallback(public::not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{accounts, companies, menus, roles};

    Router::new()
        .route("/api/auth/whoami", get(protected::whoami))
        // Accounts
        .route("/api/accounts", get(accounts::list).post(accounts::create))
        .route(
            "/api/accounts/:id",
            put(accounts::update).delete(accounts::delete),
        )
        .route("/api/accounts/:id/reset-password", put(accounts::reset_password))
        // Companies
        .route("/api/companies", get(companies::tree).post(companies::create))
        .route(
            "/api/companies/:id",
            get(companies::show)
                .put(companies::update)
                .delete(companies::delete),
        )
        // Menus
        .route("/api/user-menus", get(menus::user_menus))
        .route("/api/menus/tree", get(menus::full_tree))
        .route("/api/menus", post(menus::create))
        .route("/api/menus/:id", put(menus::update).delete(menus::delete))
        // Roles and menu permissions
        .route("/api/roles", get(roles::list))
        .route("/api/roles/:id/menus", get(roles::menus_get).put(roles::menus_put))
        // Layers run bottom-up: the token check wraps the account reload
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            validate_user_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}
