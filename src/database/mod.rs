pub mod manager;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use postgres::PgStore;
pub use repository::{AccountRepository, CompanyRepository, MenuRepository, RoleRepository, Store};
