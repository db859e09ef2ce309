//! Hierarchical tenant authorization: descendant closure over the company
//! tree and the per-request scope derived from it.

pub mod descendants;
pub mod scope;

pub use descendants::descendants;
pub use scope::{
    Action, AllowedCompanies, AuthorizationScope, RoleKind, ScopeEvaluator, COMPANY_ADMIN, SUPERADMIN,
};
