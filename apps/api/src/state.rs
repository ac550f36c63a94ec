use std::sync::Arc;

use crate::config::Config;
use crate::intake::IntakeGuard;
use crate::kv::RecordStore;
use crate::pipeline::{Pipeline, StatusBoard};
use crate::storage::BlobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Same store the pipeline writes to; read by the results endpoints.
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Single in-flight run guard.
    pub intake: IntakeGuard,
    /// Latest state of the current (or last) run.
    pub status: StatusBoard,
    pub config: Config,
}
