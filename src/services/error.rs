use thiserror::Error;

use crate::database::DatabaseError;

/// Outcome taxonomy shared by every service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input, detected before any storage access
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("{0}")]
    NotFound(String),

    /// Outside the caller's scope, or a protected entity
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A transactional replace failed and was rolled back
    #[error("{0}")]
    Integrity(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
