pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::ingestion::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/jobs/:job_id/process-emails",
            post(handlers::handle_process_emails),
        )
        .route(
            "/api/v1/jobs/:job_id/applications",
            get(handlers::handle_list_applications),
        )
        .route(
            "/api/v1/applications/:id/status",
            patch(handlers::handle_update_status),
        )
        .with_state(state)
}
