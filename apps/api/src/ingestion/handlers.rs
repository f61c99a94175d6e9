use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::orchestrator::{IngestionRun, RunReport};
use crate::ingestion::store::{self, PgStore};
use crate::mailbox::gmail::GmailClient;
use crate::mailbox::mutator::RetryPolicy;
use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::scoring::scorer::ResumeScorer;
use crate::state::AppState;

/// POST /api/v1/jobs/:job_id/process-emails
///
/// Triggers one ingestion run for the job. Always returns the run report —
/// on fatal abort the report carries partial results plus the error field.
pub async fn handle_process_emails(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<RunReport>, AppError> {
    let job = store::find_job(&state.db, job_id)
        .await
        .map_err(AppError::Internal)?
        .filter(|j| j.active)
        .ok_or_else(|| AppError::NotFound(format!("Active job {job_id} not found")))?;

    let credential = store::find_mailbox_credential(&state.db)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::Validation("No mailbox credential configured".to_string()))?;

    // Per-run mailbox context — nothing mailbox-scoped outlives this handler.
    let mailbox = GmailClient::new(&state.config.gmail_api_base, credential.access_token)
        .map_err(|e| AppError::Mailbox(e.to_string()))?;
    let pg_store = PgStore::new(state.db.clone());
    let scorer = ResumeScorer::new(state.backend.clone(), state.cache.clone());

    let run = IngestionRun {
        mailbox: &mailbox,
        store: &pg_store,
        scorer: &scorer,
        job: &job,
        retry: RetryPolicy::default(),
        processed_label: state.config.processed_label_id.clone(),
    };

    Ok(Json(run.run().await))
}

/// GET /api/v1/jobs/:job_id/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Vec<ApplicationRow>>, AppError> {
    store::find_job(&state.db, job_id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let applications = store::list_applications(&state.db, job_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(applications))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<ApplicationRow>, AppError> {
    let updated = store::update_application_status(&state.db, id, req.status)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    Ok(Json(updated))
}
