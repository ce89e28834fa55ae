//! Topic catalog endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateTopicRequest, NotificationTopic, UpdateTopicRequest};
use crate::AppState;

/// GET /api/topics - List all topics.
pub async fn list_topics(State(state): State<AppState>) -> ApiResult<Vec<NotificationTopic>> {
    success(state.repo.list_topics().await?)
}

/// POST /api/topics - Create a new topic.
pub async fn create_topic(
    State(state): State<AppState>,
    Json(request): Json<CreateTopicRequest>,
) -> ApiResult<NotificationTopic> {
    if request.slug.trim().is_empty() {
        return Err(AppError::Validation("Topic slug is required".to_string()));
    }
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Topic name is required".to_string()));
    }

    let topic = state.repo.create_topic(&request).await?;
    tracing::info!(slug = %topic.slug, "Notification topic created");
    success(topic)
}

/// PUT /api/topics/:id - Update a topic.
pub async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTopicRequest>,
) -> ApiResult<NotificationTopic> {
    if matches!(request.name.as_deref(), Some(name) if name.trim().is_empty()) {
        return Err(AppError::Validation("Topic name cannot be empty".to_string()));
    }

    success(state.repo.update_topic(&id, &request).await?)
}

/// DELETE /api/topics/:id - Soft-delete a topic.
pub async fn delete_topic(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.repo.delete_topic(&id).await?;
    tracing::info!(topic_id = %id, "Notification topic deleted");
    success(())
}
