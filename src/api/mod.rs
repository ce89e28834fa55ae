//! REST API module.
//!
//! Contains the job trigger endpoints and the notification admin/inbox handlers.

mod groups;
mod jobs;
mod notifications;
mod topics;

pub use groups::*;
pub use jobs::*;
pub use notifications::*;
pub use topics::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthenticatedPrincipal;
use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        success: true,
        data,
    })
}

/// Reject callers confined to another tenant.
fn ensure_company_access(principal: &AuthenticatedPrincipal, company_id: &str) -> Result<(), AppError> {
    match principal.company_id() {
        Some(own) if own != company_id => Err(AppError::Forbidden(format!(
            "Company {} is outside your organization",
            company_id
        ))),
        _ => Ok(()),
    }
}
