//! Resume scorer — validates and truncates resume text, consults the score
//! cache, invokes the scoring backend once, and parses its structured reply.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::{CompletionBackend, LlmError};
use crate::scoring::cache::ScoreCache;
use crate::scoring::prompts::{SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM};
use crate::scoring::ScoreResult;

/// Resume text shorter than this is rejected without a model call.
pub const MIN_RESUME_CHARS: usize = 150;
/// Resume text is truncated to this budget before prompting (head kept).
pub const MAX_RESUME_CHARS: usize = 6000;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// Quota/auth failure — aborts the entire run.
    #[error("scoring backend fatal failure: {0}")]
    Fatal(LlmError),

    /// Transport or backend failure after retries — recoverable per message.
    #[error("scoring backend failure: {0}")]
    Backend(LlmError),

    /// The model replied, but not in the expected format.
    #[error("model response could not be parsed: {0}")]
    InvalidResponse(String),
}

pub struct ResumeScorer {
    backend: Arc<dyn CompletionBackend>,
    cache: Arc<ScoreCache>,
}

impl ResumeScorer {
    pub fn new(backend: Arc<dyn CompletionBackend>, cache: Arc<ScoreCache>) -> Self {
        Self { backend, cache }
    }

    /// Scores one resume against one job description.
    ///
    /// Short or empty resume text yields a deterministic zero-score
    /// diagnostic without touching the backend. Cached failures are not
    /// trusted — only cached successes short-circuit the call.
    pub async fn score(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<ScoreResult, ScoreError> {
        let resume_text = resume_text.trim();
        if resume_text.chars().count() < MIN_RESUME_CHARS {
            return Ok(ScoreResult::unscorable(
                "resume text is too short to assess",
            ));
        }

        if let Some(cached) = self.cache.get(resume_text, job_description) {
            if !cached.is_failure() {
                debug!("Score cache hit");
                return Ok(cached);
            }
            // Cached failures are re-attempted rather than trusted.
        }

        let truncated = truncate_resume(resume_text, MAX_RESUME_CHARS);
        let prompt = SCORING_PROMPT_TEMPLATE
            .replace("{job_description}", job_description)
            .replace("{resume_text}", &truncated);

        let reply = self
            .backend
            .complete(&prompt, SCORING_SYSTEM)
            .await
            .map_err(|e| {
                if e.is_fatal() {
                    ScoreError::Fatal(e)
                } else {
                    ScoreError::Backend(e)
                }
            })?;

        let result = parse_score_response(&reply).ok_or_else(|| {
            warn!("Unparseable scoring reply: {reply:?}");
            ScoreError::InvalidResponse("missing score or summary".to_string())
        })?;

        self.cache.set(resume_text, job_description, result.clone());
        Ok(result)
    }
}

/// Keeps the head of the document and appends an ellipsis marker when over
/// budget. Splits on a char boundary.
fn truncate_resume(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}…")
}

/// Scans the reply line-by-line for the three known markers; any other line
/// is ignored. Returns None when the reply has no usable score (0 or absent)
/// or an empty summary — a bogus success must not be persisted as-is.
fn parse_score_response(reply: &str) -> Option<ScoreResult> {
    let mut score: Option<u8> = None;
    let mut summary = String::new();
    let mut missing_skills = Vec::new();
    let mut in_skills = false;

    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = strip_prefix_ci(line, "score:") {
            score = parse_leading_int(rest);
            in_skills = false;
        } else if let Some(rest) = strip_prefix_ci(line, "summary:") {
            summary = rest.trim().to_string();
            in_skills = false;
        } else if strip_prefix_ci(line, "missing skills:").is_some() {
            in_skills = true;
        } else if in_skills {
            if let Some(skill) = line.strip_prefix('-') {
                let skill = skill.trim();
                if !skill.is_empty() {
                    missing_skills.push(skill.to_string());
                }
            }
        }
    }

    match (score, summary.is_empty()) {
        (Some(score), false) if (1..=10).contains(&score) => Some(ScoreResult {
            score,
            summary,
            missing_skills,
        }),
        _ => None,
    }
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

/// Pulls the first integer out of text like " 8", "[8]", or "8/10".
fn parse_leading_int(text: &str) -> Option<u8> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedBackend {
        reply: String,
        calls: AtomicU32,
    }

    impl FixedBackend {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    const GOOD_REPLY: &str = "Score: 8\n\
        Summary: Strong backend experience, education is relevant.\n\
        Missing Skills:\n\
        - Kubernetes\n\
        - Terraform";

    fn long_resume() -> String {
        "Backend engineer with seven years of experience in Rust and Postgres. "
            .repeat(5)
    }

    fn scorer(backend: Arc<FixedBackend>) -> ResumeScorer {
        ResumeScorer::new(backend, Arc::new(ScoreCache::new()))
    }

    #[test]
    fn test_parse_well_formed_reply() {
        let result = parse_score_response(GOOD_REPLY).unwrap();
        assert_eq!(result.score, 8);
        assert_eq!(
            result.summary,
            "Strong backend experience, education is relevant."
        );
        assert_eq!(result.missing_skills, vec!["Kubernetes", "Terraform"]);
    }

    #[test]
    fn test_parse_ignores_unknown_lines() {
        let reply = "Here is my assessment:\nScore: [7]\nNote: details below\nSummary: Relevant.\nMissing Skills:\n- Docker";
        let result = parse_score_response(reply).unwrap();
        assert_eq!(result.score, 7);
        assert_eq!(result.missing_skills, vec!["Docker"]);
    }

    #[test]
    fn test_parse_rejects_zero_score() {
        let reply = "Score: 0\nSummary: Something.\nMissing Skills:";
        assert!(parse_score_response(reply).is_none());
    }

    #[test]
    fn test_parse_rejects_empty_summary() {
        let reply = "Score: 6\nSummary:\nMissing Skills:\n- Rust";
        assert!(parse_score_response(reply).is_none());
    }

    #[test]
    fn test_parse_rejects_out_of_range_score() {
        let reply = "Score: 42\nSummary: Great.\nMissing Skills:";
        assert!(parse_score_response(reply).is_none());
    }

    #[test]
    fn test_parse_score_ten() {
        let reply = "Score: 10\nSummary: Perfect match.";
        assert_eq!(parse_score_response(reply).unwrap().score, 10);
    }

    #[test]
    fn test_truncate_keeps_head_and_appends_marker() {
        let text = "a".repeat(MAX_RESUME_CHARS + 50);
        let truncated = truncate_resume(&text, MAX_RESUME_CHARS);
        assert_eq!(truncated.chars().count(), MAX_RESUME_CHARS + 1);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_resume("short", MAX_RESUME_CHARS), "short");
    }

    #[tokio::test]
    async fn test_short_resume_skips_backend() {
        let backend = Arc::new(FixedBackend::new(GOOD_REPLY));
        let result = scorer(backend.clone())
            .score("too short", "A job description")
            .await
            .unwrap();
        assert_eq!(result.score, 0);
        assert!(!result.summary.is_empty());
        assert!(result.missing_skills.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_second_call() {
        let backend = Arc::new(FixedBackend::new(GOOD_REPLY));
        let cache = Arc::new(ScoreCache::new());
        let scorer = ResumeScorer::new(backend.clone(), cache);
        let resume = long_resume();

        let first = scorer.score(&resume, "A job description").await.unwrap();
        let second = scorer.score(&resume, "A job description").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_failure_is_reattempted() {
        let backend = Arc::new(FixedBackend::new(GOOD_REPLY));
        let cache = Arc::new(ScoreCache::new());
        let resume = long_resume();
        cache.set(
            resume.trim(),
            "A job description",
            ScoreResult::unscorable("earlier failure"),
        );

        let scorer = ResumeScorer::new(backend.clone(), cache);
        let result = scorer.score(&resume, "A job description").await.unwrap();

        assert_eq!(result.score, 8);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_garbage_reply_is_invalid_response() {
        let backend = Arc::new(FixedBackend::new("I cannot assess this resume."));
        let err = scorer(backend)
            .score(&long_resume(), "A job description")
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_fatal_backend_error_propagates() {
        struct QuotaBackend;

        #[async_trait]
        impl CompletionBackend for QuotaBackend {
            async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
                Err(LlmError::Api {
                    status: 429,
                    message: "quota exceeded".to_string(),
                })
            }
        }

        let scorer = ResumeScorer::new(Arc::new(QuotaBackend), Arc::new(ScoreCache::new()));
        let err = scorer
            .score(&long_resume(), "A job description")
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::Fatal(_)));
    }
}
