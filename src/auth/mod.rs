//! Job-secret and session authentication.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::AppState;

/// Header carrying a web session token.
pub const SESSION_HEADER: &str = "x-session-token";

/// Who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatedPrincipal {
    User {
        id: String,
        company_id: String,
        is_staff: bool,
    },
    Driver {
        id: String,
        company_id: String,
    },
    /// The external scheduler, authenticated by the shared job secret
    SystemUser,
}

impl AuthenticatedPrincipal {
    /// Staff users and the scheduler may run jobs and administer notifications.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            AuthenticatedPrincipal::SystemUser
                | AuthenticatedPrincipal::User { is_staff: true, .. }
        )
    }

    /// The tenant this principal is confined to; `None` for the scheduler.
    pub fn company_id(&self) -> Option<&str> {
        match self {
            AuthenticatedPrincipal::User { company_id, .. }
            | AuthenticatedPrincipal::Driver { company_id, .. } => Some(company_id),
            AuthenticatedPrincipal::SystemUser => None,
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            AuthenticatedPrincipal::User { id, .. } => format!("user:{}", id),
            AuthenticatedPrincipal::Driver { id, .. } => format!("driver:{}", id),
            AuthenticatedPrincipal::SystemUser => "system".to_string(),
        }
    }
}

/// Resolve the caller from request headers.
///
/// A bearer token equal to the job secret yields [`AuthenticatedPrincipal::SystemUser`].
/// Otherwise the session header is looked up. Returns `Ok(None)` when neither
/// identifies anyone. Without a configured job secret, bearer tokens are never
/// accepted.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthenticatedPrincipal>, AppError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    if let (Some(provided), Some(expected)) = (bearer, state.config.job_secret.as_deref()) {
        if constant_time_compare(provided.trim(), expected) {
            return Ok(Some(AuthenticatedPrincipal::SystemUser));
        }
    }

    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match session {
        Some(token) => state.repo.find_session_principal(token, Utc::now()).await,
        None => Ok(None),
    }
}

/// Middleware for job and admin routes: requires the job secret or a staff session.
pub async fn privileged_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()).await {
        Ok(Some(principal)) if principal.is_privileged() => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(_) => AppError::Unauthorized("Missing or invalid job secret or staff session".into())
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Middleware for end-user routes: requires any valid session or the job secret.
pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()).await {
        Ok(Some(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(None) => AppError::Unauthorized("Missing or invalid session".into()).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("job-secret-123", "job-secret-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("job-secret-123", "job-secret-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-secret"));
    }

    #[test]
    fn test_privileged_principals() {
        assert!(AuthenticatedPrincipal::SystemUser.is_privileged());
        assert!(AuthenticatedPrincipal::User {
            id: "u1".into(),
            company_id: "c1".into(),
            is_staff: true,
        }
        .is_privileged());
        assert!(!AuthenticatedPrincipal::User {
            id: "u2".into(),
            company_id: "c1".into(),
            is_staff: false,
        }
        .is_privileged());
        assert!(!AuthenticatedPrincipal::Driver {
            id: "d1".into(),
            company_id: "c1".into(),
        }
        .is_privileged());
    }

    #[test]
    fn test_company_scope() {
        assert_eq!(AuthenticatedPrincipal::SystemUser.company_id(), None);
        let driver = AuthenticatedPrincipal::Driver {
            id: "d1".into(),
            company_id: "c9".into(),
        };
        assert_eq!(driver.company_id(), Some("c9"));
        assert_eq!(driver.describe(), "driver:d1");
    }
}
