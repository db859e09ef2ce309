// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT auth + account reload)
//
// Handlers stay thin: parse the boundary (path ids, JSON bodies), hand the
// request to a service together with the current `Caller`, and wrap the
// result in the response envelope.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use std::str::FromStr;

use crate::error::ApiError;
use crate::types::InvalidId;

pub mod protected; // Tier 2: JWT authentication required (/api/*)
pub mod public; // Tier 1: No authentication required

/// Unwrap a JSON body, keeping extractor failures inside the error envelope
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        // Well-formed JSON with bad values (non-positive ids, wrong types)
        Err(JsonRejection::JsonDataError(e)) => {
            tracing::debug!("Invalid request body: {}", e);
            Err(ApiError::validation_error(e.body_text(), None))
        }
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection);
            Err(ApiError::bad_request(rejection.body_text()))
        }
    }
}

/// Parse a typed id from a path segment
pub fn path_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = InvalidId>,
{
    raw.parse::<T>().map_err(ApiError::from)
}
