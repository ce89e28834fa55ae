//! Scheduler-facing job endpoints.
//!
//! Partial failures are reported inside the summary with HTTP 200; only a
//! failure to load the topic or the documents turns into an error status.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::auth::AuthenticatedPrincipal;
use crate::errors::AppError;
use crate::models::{DocumentClass, ExpirySummary};
use crate::AppState;

/// Body returned by every `check-expiring-*` endpoint.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub success: bool,
    pub message: String,
    pub summary: ExpirySummary,
}

/// GET|POST /jobs/check-expiring-vehicle-documents
pub async fn check_expiring_vehicle_documents(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> Result<Json<JobResponse>, AppError> {
    run_class(&state, &principal, DocumentClass::Vehicle).await
}

/// GET|POST /jobs/check-expiring-driver-documents
pub async fn check_expiring_driver_documents(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> Result<Json<JobResponse>, AppError> {
    run_class(&state, &principal, DocumentClass::Driver).await
}

/// GET|POST /jobs/check-expiring-user-documents
pub async fn check_expiring_user_documents(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> Result<Json<JobResponse>, AppError> {
    run_class(&state, &principal, DocumentClass::User).await
}

/// GET|POST /jobs/check-expiring-documents - All classes in one run.
pub async fn check_expiring_documents(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthenticatedPrincipal>,
) -> Result<Json<JobResponse>, AppError> {
    tracing::info!(triggered_by = %principal.describe(), "Expiry check requested for all documents");

    let summary = state.expiry_job.run_all(Utc::now()).await?;
    let message = format!(
        "Checked {} documents, sent {} notifications",
        summary.total_checked, summary.notifications_sent
    );

    Ok(Json(JobResponse {
        success: true,
        message,
        summary,
    }))
}

async fn run_class(
    state: &AppState,
    principal: &AuthenticatedPrincipal,
    class: DocumentClass,
) -> Result<Json<JobResponse>, AppError> {
    tracing::info!(triggered_by = %principal.describe(), class = %class, "Expiry check requested");

    let summary = state.expiry_job.run(class, Utc::now()).await?;
    let message = format!(
        "Checked {} {} documents, sent {} notifications",
        summary.total_checked, class, summary.notifications_sent
    );

    Ok(Json(JobResponse {
        success: true,
        message,
        summary,
    }))
}
