//! Notification group endpoints.
//!
//! Staff users only see and change groups of their own company; the job
//! secret is not confined to a tenant.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{ensure_company_access, success, ApiResult};
use crate::auth::AuthenticatedPrincipal;
use crate::errors::AppError;
use crate::models::{AddMemberRequest, CreateGroupRequest, NotificationGroup, SubscribeTopicRequest};
use crate::AppState;

/// Query parameters for listing groups.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupListQuery {
    #[serde(default)]
    pub company_id: Option<String>,
}

/// GET /api/groups - List groups of a company.
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Query(params): Query<GroupListQuery>,
) -> ApiResult<Vec<NotificationGroup>> {
    let company_id = target_company(&principal, params.company_id)?;
    success(state.repo.list_groups(&company_id).await?)
}

/// POST /api/groups - Create a group.
pub async fn create_group(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<NotificationGroup> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Group name is required".to_string()));
    }

    let company_id = target_company(&principal, request.company_id.clone())?;
    let group = state.repo.create_group(&company_id, &request).await?;
    tracing::info!(group_id = %group.id, company_id = %company_id, "Notification group created");
    success(group)
}

/// DELETE /api/groups/:id - Delete a group with its memberships and subscriptions.
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    load_group(&state, &principal, &id).await?;
    state.repo.delete_group(&id).await?;
    success(())
}

/// POST /api/groups/:id/members - Add a user of the same company.
pub async fn add_group_member(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path(id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> ApiResult<NotificationGroup> {
    let group = load_group(&state, &principal, &id).await?;

    let user_company = state
        .repo
        .get_user_company(&request.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", request.user_id)))?;
    if user_company != group.company_id {
        return Err(AppError::Validation(
            "Group members must belong to the group's company".to_string(),
        ));
    }

    state.repo.add_group_member(&id, &request.user_id).await?;
    reload_group(&state, &id).await
}

/// DELETE /api/groups/:id/members/:user_id - Remove a member.
pub async fn remove_group_member(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<NotificationGroup> {
    load_group(&state, &principal, &id).await?;
    state.repo.remove_group_member(&id, &user_id).await?;
    reload_group(&state, &id).await
}

/// POST /api/groups/:id/topics - Subscribe to a topic.
pub async fn subscribe_group(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path(id): Path<String>,
    Json(request): Json<SubscribeTopicRequest>,
) -> ApiResult<NotificationGroup> {
    load_group(&state, &principal, &id).await?;
    state
        .repo
        .get_topic(&request.topic_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", request.topic_id)))?;

    state.repo.subscribe_group(&id, &request.topic_id).await?;
    reload_group(&state, &id).await
}

/// DELETE /api/groups/:id/topics/:topic_id - Unsubscribe from a topic.
pub async fn unsubscribe_group(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
    Path((id, topic_id)): Path<(String, String)>,
) -> ApiResult<NotificationGroup> {
    load_group(&state, &principal, &id).await?;
    state.repo.unsubscribe_group(&id, &topic_id).await?;
    reload_group(&state, &id).await
}

/// Staff users are pinned to their company; the scheduler must name one.
fn target_company(
    principal: &AuthenticatedPrincipal,
    requested: Option<String>,
) -> Result<String, AppError> {
    match (principal.company_id(), requested) {
        (Some(own), Some(requested)) => {
            ensure_company_access(principal, &requested)?;
            Ok(own.to_string())
        }
        (Some(own), None) => Ok(own.to_string()),
        (None, Some(requested)) if !requested.trim().is_empty() => Ok(requested),
        (None, _) => Err(AppError::Validation("companyId is required".to_string())),
    }
}

async fn load_group(
    state: &AppState,
    principal: &AuthenticatedPrincipal,
    id: &str,
) -> Result<NotificationGroup, AppError> {
    let group = state
        .repo
        .get_group(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {} not found", id)))?;
    // Hide other tenants' groups entirely
    if ensure_company_access(principal, &group.company_id).is_err() {
        return Err(AppError::NotFound(format!("Group {} not found", id)));
    }
    Ok(group)
}

async fn reload_group(state: &AppState, id: &str) -> ApiResult<NotificationGroup> {
    let group = state
        .repo
        .get_group(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {} not found", id)))?;
    success(group)
}
