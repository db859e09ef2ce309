// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: JWT Authentication Required
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware → validate_user_middleware, which injects
// the `Caller` every handler here extracts.

pub mod accounts;
pub mod companies;
pub mod menus;
pub mod roles;
pub mod whoami;

pub use whoami::whoami;
