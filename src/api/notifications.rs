//! In-app notification inbox.

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::auth::AuthenticatedPrincipal;
use crate::errors::AppError;
use crate::models::Notification;
use crate::AppState;

/// Query parameters for the inbox.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
    /// Maximum number of notifications (default: 50).
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Maximum number of notifications returned at once.
const MAX_INBOX_LIMIT: i64 = 200;

/// GET /api/notifications - The caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Query(params): Query<InboxQuery>,
) -> ApiResult<Vec<Notification>> {
    let user_id = inbox_owner(&principal)?;
    let limit = params.limit.clamp(1, MAX_INBOX_LIMIT);

    success(
        state
            .repo
            .list_notifications_for_user(user_id, params.unread_only, limit)
            .await?,
    )
}

/// PUT /api/notifications/:id/read - Mark one notification read.
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let user_id = inbox_owner(&principal)?;
    state.repo.mark_notification_read(&id, user_id).await?;
    success(())
}

/// Only users have an inbox.
fn inbox_owner(principal: &AuthenticatedPrincipal) -> Result<&str, AppError> {
    match principal {
        AuthenticatedPrincipal::User { id, .. } => Ok(id),
        _ => Err(AppError::Forbidden(
            "Only user sessions have a notification inbox".to_string(),
        )),
    }
}
