#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored mailbox OAuth credential. Token exchange happens outside this
/// service; the pipeline consumes the current access token per run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MailboxCredentialRow {
    pub id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
}
