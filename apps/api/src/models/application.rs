#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Review status set by a human reviewer. The pipeline only ever creates
/// applications as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// One persisted application row. `source_message_id` is UNIQUE — the dedup
/// invariant: at most one application per mailbox message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_email: String,
    pub applicant_name: Option<String>,
    pub resume_text: String,
    pub score: i16,
    pub summary: String,
    pub missing_skills: Vec<String>,
    pub attachment_filename: Option<String>,
    pub source_message_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Compact view returned in run reports — omits the full resume text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub applicant_email: String,
    pub applicant_name: Option<String>,
    pub score: i16,
    pub summary: String,
    pub missing_skills: Vec<String>,
    pub attachment_filename: Option<String>,
    pub source_message_id: String,
}

impl From<&ApplicationRow> for ApplicationSummary {
    fn from(row: &ApplicationRow) -> Self {
        ApplicationSummary {
            id: row.id,
            applicant_email: row.applicant_email.clone(),
            applicant_name: row.applicant_name.clone(),
            score: row.score,
            summary: row.summary.clone(),
            missing_skills: row.missing_skills.clone(),
            attachment_filename: row.attachment_filename.clone(),
            source_message_id: row.source_message_id.clone(),
        }
    }
}
