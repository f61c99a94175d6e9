//! Marks processed messages read (plus an optional processed label) with a
//! bounded retry policy.
//!
//! This is a best-effort optimization so later runs list fewer candidates —
//! dedup correctness lives in the persisted `source_message_id` uniqueness,
//! not here. A mutation failure must never roll back a persisted application.

use std::time::Duration;

use tracing::warn;

use crate::mailbox::{LabelChange, MailboxError, MailboxProvider};

const UNREAD_LABEL: &str = "UNREAD";

/// Bounded retry configuration for label mutation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Removes the unread marker (and applies `processed_label` when configured),
/// retrying up to `policy.max_attempts` with a fixed delay between attempts.
pub async fn mark_processed(
    mailbox: &dyn MailboxProvider,
    message_id: &str,
    processed_label: Option<&str>,
    policy: &RetryPolicy,
) -> Result<(), MailboxError> {
    let change = LabelChange {
        add: processed_label.map(String::from).into_iter().collect(),
        remove: vec![UNREAD_LABEL.to_string()],
    };

    let mut last_error = None;
    for attempt in 1..=policy.max_attempts {
        match mailbox.modify_labels(message_id, &change).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(
                    "Label mutation for message {message_id} failed (attempt {attempt}/{}): {e}",
                    policy.max_attempts
                );
                last_error = Some(e);
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(last_error.expect("at least one attempt was made"))
}
