// Resume scoring: content-keyed cache + prompt build + model-response parsing.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod cache;
pub mod prompts;
pub mod scorer;

use serde::{Deserialize, Serialize};

/// Outcome of scoring one (resume, job description) pair. Immutable once
/// produced. Score 0 is reserved for "could not be assessed" and always
/// carries a diagnostic summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u8,
    pub summary: String,
    pub missing_skills: Vec<String>,
}

impl ScoreResult {
    /// The generic diagnostic result substituted when a resume cannot be
    /// assessed. The application is still persisted, flagged for review.
    pub fn unscorable(reason: &str) -> Self {
        ScoreResult {
            score: 0,
            summary: format!("Could not be assessed automatically: {reason}"),
            missing_skills: vec![],
        }
    }

    /// Failure results are not trusted when cached — callers re-attempt.
    pub fn is_failure(&self) -> bool {
        self.score == 0
    }
}
