//! Axum route handlers for resume submission and lookup.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::intake::{read_submission, validate};
use crate::kv::{list_records, load_record};
use crate::models::ResumeRecord;
use crate::pipeline::RunState;
use crate::state::AppState;

pub const RUN_STATUS_PATH: &str = "/api/v1/runs/current";

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status_url: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    #[serde(flatten)]
    pub state: RunState,
    pub status_text: String,
    pub busy: bool,
}

/// POST /api/v1/resumes
///
/// Accepts the upload form and starts one pipeline run in the background.
/// Progress is polled from `GET /api/v1/runs/current`.
pub async fn handle_submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let input = read_submission(&mut multipart, state.config.max_upload_bytes).await?;
    validate(&input)?;

    let permit = state
        .intake
        .try_acquire()
        .ok_or_else(|| AppError::Conflict("A resume is already being analyzed".to_string()))?;

    info!(
        "Accepted submission for '{}' at '{}'",
        input.job_title, input.company_name
    );
    state.status.reset();

    let pipeline = state.pipeline.clone();
    let board = state.status.clone();
    tokio::spawn(async move {
        let _permit = permit;
        pipeline.run(input, &board).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status_url: RUN_STATUS_PATH,
        }),
    ))
}

/// GET /api/v1/runs/current
pub async fn handle_run_status(State(state): State<AppState>) -> Json<RunStatusResponse> {
    let current = state.status.current();
    Json(RunStatusResponse {
        status_text: current.status_text(),
        state: current,
        busy: state.intake.is_busy(),
    })
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    Ok(Json(list_records(&*state.records).await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    Ok(Json(find_record(&state, &id).await?))
}

/// GET /api/v1/resumes/:id/image
pub async fn handle_get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = find_record(&state, &id).await?;
    let bytes = state.blobs.download(&record.image_path).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

/// GET /api/v1/resumes/:id/document
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = find_record(&state, &id).await?;
    let bytes = state.blobs.download(&record.resume_path).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}

async fn find_record(state: &AppState, id: &str) -> Result<ResumeRecord, AppError> {
    load_record(&*state.records, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
}
