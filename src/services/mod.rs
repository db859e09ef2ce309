pub mod account_service;
pub mod caller;
pub mod company_service;
pub mod error;
pub mod menu_service;
pub mod session_service;

pub use account_service::{
    AccountService, CreateAccountRequest, ResetPasswordRequest, UpdateAccountRequest,
};
pub use caller::Caller;
pub use company_service::CompanyService;
pub use error::{ServiceError, ServiceResult};
pub use menu_service::MenuService;
pub use session_service::{LoginRequest, LoginResponse, SessionService, WhoAmI};
