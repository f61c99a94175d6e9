//! Content-keyed score cache — avoids repeated model calls for identical
//! (resume, job description) pairs.
//!
//! Keys are fingerprints of bounded prefixes, not full texts: cheap to
//! compute, and near-duplicate resumes/descriptions deliberately collapse
//! into the same slot. Entries expire after a fixed TTL and are evicted
//! lazily on lookup. Safe to share across concurrent runs — operations are
//! read-then-overwrite and staleness is tolerable.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::scoring::ScoreResult;

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const FINGERPRINT_PREFIX_BYTES: usize = 200;

struct CacheEntry {
    value: ScoreResult,
    inserted_at: Instant,
}

pub struct ScoreCache {
    entries: Mutex<HashMap<u64, CacheEntry>>,
    ttl: Duration,
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached result for this pair, or None on miss or expiry.
    /// Expired entries are removed on the way out.
    pub fn get(&self, resume_text: &str, job_description: &str) -> Option<ScoreResult> {
        let key = fingerprint(resume_text, job_description);
        let mut entries = self.entries.lock().expect("score cache poisoned");
        match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Always overwrites any existing entry for this pair.
    pub fn set(&self, resume_text: &str, job_description: &str, value: ScoreResult) {
        let key = fingerprint(resume_text, job_description);
        let mut entries = self.entries.lock().expect("score cache poisoned");
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}

/// Cheap derived key over bounded prefixes of both inputs.
fn fingerprint(resume_text: &str, job_description: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    prefix_bytes(resume_text).hash(&mut hasher);
    prefix_bytes(job_description).hash(&mut hasher);
    hasher.finish()
}

fn prefix_bytes(s: &str) -> &[u8] {
    let bytes = s.as_bytes();
    &bytes[..bytes.len().min(FINGERPRINT_PREFIX_BYTES)]
}
