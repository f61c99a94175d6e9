//! Mailbox provider contract and the provider-independent message model.
//!
//! `RawMessage` and `MimeNode` deliberately do not mirror any wire schema:
//! `mailbox::gmail` translates Gmail's REST shapes into this model so the
//! ingestion pipeline stays independent of the provider.

pub mod gmail;
pub mod mutator;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mailbox API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Mailbox authentication failed: {0}")]
    Auth(String),
}

impl MailboxError {
    /// Auth failures abort an entire ingestion run; transport and API errors
    /// are recoverable at per-message granularity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MailboxError::Auth(_))
    }
}

/// Parsed `From`/`Subject` headers of a mailbox message.
#[derive(Debug, Clone)]
pub struct MessageHeaders {
    pub from: String,
    pub subject: String,
}

/// One node of a message body tree. Leaves either carry decoded data inline
/// or reference remote attachment content by id.
#[derive(Debug, Clone)]
pub enum MimeNode {
    Leaf {
        mime_type: String,
        filename: Option<String>,
        data: Option<Bytes>,
        attachment_id: Option<String>,
    },
    Multipart {
        mime_type: String,
        children: Vec<MimeNode>,
    },
}

impl MimeNode {
    pub fn text_leaf(data: &str) -> Self {
        MimeNode::Leaf {
            mime_type: "text/plain".to_string(),
            filename: None,
            data: Some(Bytes::copy_from_slice(data.as_bytes())),
            attachment_id: None,
        }
    }
}

/// An external mailbox message. Never mutated except through
/// `mutator::mark_processed`.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: String,
    pub headers: MessageHeaders,
    pub payload: MimeNode,
    pub unread: bool,
}

/// Label mutation applied to a processed message.
#[derive(Debug, Clone, Default)]
pub struct LabelChange {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

/// The mailbox provider contract consumed by the ingestion pipeline.
/// Implemented by `gmail::GmailClient` in production and by in-memory
/// mailboxes in tests.
#[async_trait]
pub trait MailboxProvider: Send + Sync {
    /// Lists ids of unread candidate messages matching `query`.
    async fn list_unread(&self, query: &str) -> Result<Vec<String>, MailboxError>;

    /// Fetches the full message body tree for one id.
    async fn get_message(&self, id: &str) -> Result<RawMessage, MailboxError>;

    /// Resolves attachment content referenced by id — one round-trip per
    /// attachment that is not inlined.
    async fn get_attachment_data(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<Bytes, MailboxError>;

    /// Adds/removes labels on a message (used to clear the unread marker).
    async fn modify_labels(
        &self,
        message_id: &str,
        change: &LabelChange,
    ) -> Result<(), MailboxError>;
}
