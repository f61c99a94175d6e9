use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::CompletionBackend;
use crate::scoring::cache::ScoreCache;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Deliberately carries no mailbox client — mailbox sessions are constructed
/// per ingestion run from the stored credential.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable scoring backend. Production: `LlmClient`.
    pub backend: Arc<dyn CompletionBackend>,
    /// Score cache shared across concurrent runs.
    pub cache: Arc<ScoreCache>,
    pub config: Config,
}
