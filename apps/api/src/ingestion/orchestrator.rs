//! Ingestion orchestration — drives one job's run: list candidate messages,
//! pipe each through parse → classify → extract → dedup → score → persist →
//! mark-processed, and fold the per-message outcomes into a run report.
//!
//! Each message resolves independently: a failure is recorded and the loop
//! moves on. Only the fatal class (backend quota/auth, mailbox auth) stops
//! the remaining run — already-persisted applications are never rolled back.

use serde::Serialize;
use tracing::{info, warn};

use crate::ingestion::classifier::classify;
use crate::ingestion::extract::{clean_text, extract_text, find_resume_attachment};
use crate::ingestion::mime::{parse_message, ParsedEmail};
use crate::ingestion::store::{ApplicationStore, NewApplication};
use crate::mailbox::mutator::{mark_processed, RetryPolicy};
use crate::mailbox::MailboxProvider;
use crate::models::application::ApplicationSummary;
use crate::models::job::JobRow;
use crate::scoring::scorer::{ResumeScorer, ScoreError};
use crate::scoring::ScoreResult;

/// One message the run did not turn into an application, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedMessage {
    pub id: String,
    pub reason: String,
}

/// Terminal output of one run. On fatal abort, `error` is set and the
/// partial results are still reported — never a bare failure.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub success: bool,
    pub applications: Vec<ApplicationSummary>,
    pub skipped: Vec<SkippedMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-run context: collaborators are injected so runs are testable with
/// in-memory implementations, and no mailbox state outlives the run.
pub struct IngestionRun<'a> {
    pub mailbox: &'a dyn MailboxProvider,
    pub store: &'a dyn ApplicationStore,
    pub scorer: &'a ResumeScorer,
    pub job: &'a JobRow,
    pub retry: RetryPolicy,
    pub processed_label: Option<String>,
}

enum MessageOutcome {
    Processed {
        summary: ApplicationSummary,
        mutation_failure: Option<String>,
    },
    Skipped(String),
}

/// Fatal condition: the remainder of the run is cancelled.
struct RunAbort(String);

impl IngestionRun<'_> {
    /// Processes all currently unread candidate messages for the job,
    /// sequentially in listing order.
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport {
            success: true,
            applications: vec![],
            skipped: vec![],
            error: None,
        };

        let query = unread_query(&self.job.title);
        let ids = match self.mailbox.list_unread(&query).await {
            Ok(ids) => ids,
            Err(e) => {
                report.success = false;
                report.error = Some(format!("failed to list mailbox messages: {e}"));
                return report;
            }
        };
        info!(
            "Listed {} candidate messages for job {} ({})",
            ids.len(),
            self.job.id,
            self.job.title
        );

        for id in ids {
            match self.process_message(&id).await {
                Ok(MessageOutcome::Processed {
                    summary,
                    mutation_failure,
                }) => {
                    if let Some(reason) = mutation_failure {
                        report.skipped.push(SkippedMessage {
                            id: id.clone(),
                            reason,
                        });
                    }
                    report.applications.push(summary);
                }
                Ok(MessageOutcome::Skipped(reason)) => {
                    report.skipped.push(SkippedMessage { id, reason });
                }
                Err(RunAbort(reason)) => {
                    warn!("Run for job {} aborted: {reason}", self.job.id);
                    report.error = Some(reason);
                    break;
                }
            }
        }

        report.success = report.error.is_none();
        info!(
            "Run for job {} finished: {} processed, {} skipped",
            self.job.id,
            report.applications.len(),
            report.skipped.len()
        );
        report
    }

    async fn process_message(&self, id: &str) -> Result<MessageOutcome, RunAbort> {
        let msg = match self.mailbox.get_message(id).await {
            Ok(msg) => msg,
            Err(e) if e.is_fatal() => {
                return Err(RunAbort(format!("mailbox authentication failed: {e}")))
            }
            Err(e) => {
                return Ok(MessageOutcome::Skipped(format!(
                    "failed to fetch message: {e}"
                )))
            }
        };

        if classify(&msg.headers, &self.job.title).is_none() {
            return Ok(MessageOutcome::Skipped(
                "not recognized as an application for this job".to_string(),
            ));
        }

        let parsed = parse_message(self.mailbox, &msg).await;
        let (resume_text, attachment_filename) = match select_resume_text(&parsed) {
            Some(found) => found,
            None => return Ok(MessageOutcome::Skipped("no resume text found".to_string())),
        };

        // Race-safety re-check before the expensive scoring call; the insert
        // below is the authoritative guard.
        match self.store.source_message_exists(id).await {
            Ok(true) => {
                return Ok(MessageOutcome::Skipped(
                    "application already exists for this message".to_string(),
                ))
            }
            Ok(false) => {}
            Err(e) => {
                return Ok(MessageOutcome::Skipped(format!(
                    "duplicate check failed: {e}"
                )))
            }
        }

        let score = match self.scorer.score(&resume_text, &self.job.description).await {
            Ok(score) => score,
            Err(ScoreError::Fatal(e)) => {
                return Err(RunAbort(format!("scoring backend failure: {e}")))
            }
            Err(e) => {
                // Partial data beats a dropped application: persist with the
                // diagnostic result, flagged for manual review.
                warn!("Scoring failed for message {id}: {e}");
                ScoreResult::unscorable("the model reply was unusable; review manually")
            }
        };

        let row = match self
            .store
            .insert_application(NewApplication {
                job_id: self.job.id,
                applicant_email: &parsed.applicant_email,
                applicant_name: parsed.applicant_name.as_deref(),
                resume_text: &resume_text,
                score: score.score as i16,
                summary: &score.summary,
                missing_skills: &score.missing_skills,
                attachment_filename,
                source_message_id: id,
            })
            .await
        {
            Ok(Some(row)) => row,
            Ok(None) => {
                return Ok(MessageOutcome::Skipped(
                    "application already exists for this message".to_string(),
                ))
            }
            Err(e) => {
                return Ok(MessageOutcome::Skipped(format!(
                    "failed to persist application: {e}"
                )))
            }
        };

        let mutation_failure = match mark_processed(
            self.mailbox,
            id,
            self.processed_label.as_deref(),
            &self.retry,
        )
        .await
        {
            Ok(()) => None,
            Err(e) => Some(format!("mark-as-processed failed after retries: {e}")),
        };

        Ok(MessageOutcome::Processed {
            summary: (&row).into(),
            mutation_failure,
        })
    }
}

/// Candidate query: unread messages whose subject mentions any title token.
fn unread_query(job_title: &str) -> String {
    let tokens: Vec<&str> = job_title.split_whitespace().collect();
    format!("is:unread subject:({})", tokens.join(" OR "))
}

/// Picks resume text: the first resume-looking attachment that extracts,
/// else the cleaned email body. The filename only survives when the
/// attachment was actually used.
fn select_resume_text(parsed: &ParsedEmail) -> Option<(String, Option<&str>)> {
    if let Some(attachment) = find_resume_attachment(&parsed.attachments) {
        if let Some(text) = extract_text(attachment) {
            return Some((text, Some(attachment.filename.as_str())));
        }
    }
    let body = clean_text(&parsed.body_text);
    (!body.is_empty()).then_some((body, None))
}
