//! Application classification — decides whether a message is a genuine
//! application for a target job.
//!
//! The heuristic is intentionally conservative: a skipped genuine application
//! costs a re-send, a false positive pollutes the dataset. Testers should
//! expect false negatives on creative subject lines.

use crate::mailbox::MessageHeaders;

const NO_REPLY_PATTERNS: &[&str] = &["no-reply", "noreply", "do-not-reply", "donotreply"];

/// Returns the canonical job title when the message looks like an application
/// for it, or None to skip the message (not an error).
///
/// Policy: reject no-reply senders outright. Accept an exact case-insensitive
/// title substring in the subject unconditionally. Otherwise accept when at
/// least half (rounded up) of the title tokens appear in the subject AND the
/// subject contains the word "application".
pub fn classify(headers: &MessageHeaders, job_title: &str) -> Option<String> {
    let from = headers.from.to_lowercase();
    if NO_REPLY_PATTERNS.iter().any(|p| from.contains(p)) {
        return None;
    }

    let subject = headers.subject.to_lowercase();
    let title = job_title.to_lowercase();

    if !title.is_empty() && subject.contains(&title) {
        return Some(job_title.to_string());
    }

    let tokens: Vec<&str> = title.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    let matched = tokens.iter().filter(|t| subject.contains(*t)).count();
    let required = (tokens.len() + 1) / 2;

    if matched >= required && contains_word(&subject, "application") {
        Some(job_title.to_string())
    } else {
        None
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric()).any(|w| w == word)
}
