pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::intake::handlers;
use crate::state::AppState;

/// Headroom above the file limit for the text fields and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/resumes",
            get(handlers::handle_list_resumes).post(handlers::handle_submit),
        )
        .route("/api/v1/resumes/:id", get(handlers::handle_get_resume))
        .route("/api/v1/resumes/:id/image", get(handlers::handle_get_image))
        .route(
            "/api/v1/resumes/:id/document",
            get(handlers::handle_get_document),
        )
        .route(handlers::RUN_STATUS_PATH, get(handlers::handle_run_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
