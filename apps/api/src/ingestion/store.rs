//! Persistence for the ingestion pipeline.
//!
//! The orchestrator only sees the narrow `ApplicationStore` trait so runs can
//! be exercised against an in-memory store. `PgStore` is the production
//! implementation; dedup is enforced atomically with
//! `INSERT … ON CONFLICT (source_message_id) DO NOTHING`.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::models::credential::MailboxCredentialRow;
use crate::models::job::JobRow;

/// Fields of a new application as produced by one ingestion run.
#[derive(Debug, Clone)]
pub struct NewApplication<'a> {
    pub job_id: Uuid,
    pub applicant_email: &'a str,
    pub applicant_name: Option<&'a str>,
    pub resume_text: &'a str,
    pub score: i16,
    pub summary: &'a str,
    pub missing_skills: &'a [String],
    pub attachment_filename: Option<&'a str>,
    pub source_message_id: &'a str,
}

/// The persistence contract the orchestrator depends on.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// True when an application for this source message already exists.
    async fn source_message_exists(&self, source_message_id: &str) -> Result<bool>;

    /// Atomic "insert if source id absent". Returns None when another run
    /// persisted the same source message first.
    async fn insert_application(
        &self,
        new: NewApplication<'_>,
    ) -> Result<Option<ApplicationRow>>;
}

/// PostgreSQL-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn source_message_exists(&self, source_message_id: &str) -> Result<bool> {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM applications WHERE source_message_id = $1")
                .bind(source_message_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(existing.is_some())
    }

    async fn insert_application(
        &self,
        new: NewApplication<'_>,
    ) -> Result<Option<ApplicationRow>> {
        Ok(sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications
                (id, job_id, applicant_email, applicant_name, resume_text, score,
                 summary, missing_skills, attachment_filename, source_message_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (source_message_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.job_id)
        .bind(new.applicant_email)
        .bind(new.applicant_name)
        .bind(new.resume_text)
        .bind(new.score)
        .bind(new.summary)
        .bind(new.missing_skills)
        .bind(new.attachment_filename)
        .bind(new.source_message_id)
        .bind(ApplicationStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Queries used by the HTTP layer (outside the orchestrator seam)
// ────────────────────────────────────────────────────────────────────────────

/// Fetches one job posting by id.
pub async fn find_job(pool: &PgPool, job_id: Uuid) -> Result<Option<JobRow>> {
    Ok(
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(job_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Lists applications for one job, newest first.
pub async fn list_applications(pool: &PgPool, job_id: Uuid) -> Result<Vec<ApplicationRow>> {
    Ok(sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM applications WHERE job_id = $1 ORDER BY created_at DESC",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?)
}

/// Sets the reviewer-facing status of one application.
pub async fn update_application_status(
    pool: &PgPool,
    id: Uuid,
    status: ApplicationStatus,
) -> Result<Option<ApplicationRow>> {
    Ok(sqlx::query_as::<_, ApplicationRow>(
        "UPDATE applications SET status = $1 WHERE id = $2 RETURNING *",
    )
    .bind(status.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// Loads the stored mailbox credential (most recent wins).
pub async fn find_mailbox_credential(pool: &PgPool) -> Result<Option<MailboxCredentialRow>> {
    Ok(sqlx::query_as::<_, MailboxCredentialRow>(
        "SELECT * FROM mailbox_credentials ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?)
}
