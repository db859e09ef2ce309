// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service info, health probe and token acquisition.

pub mod health;
pub mod login;

pub use health::{health, not_found, root};
pub use login::login_post;
