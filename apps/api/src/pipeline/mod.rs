//! Resume ingestion pipeline.
//!
//! One run takes a submission through, strictly in order:
//!
//! ```text
//! upload document → rasterize page 1 → upload image → persist record (v1)
//!   → analyze → parse feedback → persist record (v2) → redirect
//! ```
//!
//! Each step is gated on the previous one. The first failure halts the run:
//! no retry, no rollback of earlier uploads. Status is published before every
//! awaited step so a watcher sees it before the step's latency.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::analysis::{parse_feedback, prepare_instructions, ResumeAnalyzer};
use crate::kv::{save_record, RecordStore};
use crate::models::{results_path, DocumentFile, ResumeRecord, SubmissionInput};
use crate::rasterize::DocumentRasterizer;
use crate::storage::BlobStore;

pub mod ids;
pub mod state;

pub use ids::{IdGenerator, UuidGenerator};
pub use state::{FailureKind, RunFailure, RunState, Stage, StatusBoard, StatusSink};

/// How a call to [`Pipeline::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No document was supplied; nothing happened.
    NotStarted,
    Completed {
        record_id: String,
        redirect: String,
    },
    Halted(RunFailure),
}

pub struct Pipeline {
    blobs: Arc<dyn BlobStore>,
    rasterizer: Arc<dyn DocumentRasterizer>,
    records: Arc<dyn RecordStore>,
    analyzer: Arc<dyn ResumeAnalyzer>,
    ids: Arc<dyn IdGenerator>,
}

/// Bookkeeping for a single run.
struct RunContext<'a> {
    status: &'a dyn StatusSink,
    stage: Stage,
    uploads: Vec<String>,
    record_id: Option<String>,
}

impl<'a> RunContext<'a> {
    fn new(status: &'a dyn StatusSink) -> Self {
        Self {
            status,
            stage: Stage::UploadingDocument,
            uploads: Vec::new(),
            record_id: None,
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        info!("{}", stage.status_text());
        self.status.publish(&RunState::Running { stage });
    }

    fn halt(&self, kind: FailureKind, detail: Option<String>) -> RunFailure {
        RunFailure {
            kind,
            stage: self.stage,
            detail,
            orphaned_uploads: self.uploads.clone(),
            record_id: self.record_id.clone(),
        }
    }
}

impl Pipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        rasterizer: Arc<dyn DocumentRasterizer>,
        records: Arc<dyn RecordStore>,
        analyzer: Arc<dyn ResumeAnalyzer>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            blobs,
            rasterizer,
            records,
            analyzer,
            ids,
        }
    }

    /// Drives one submission to completion or to its first failure.
    pub async fn run(&self, input: SubmissionInput, status: &dyn StatusSink) -> RunOutcome {
        let Some(document) = input.document.as_ref() else {
            warn!("Submission has no document; pipeline not started");
            return RunOutcome::NotStarted;
        };

        let mut ctx = RunContext::new(status);
        match self.execute(&input, document, &mut ctx).await {
            Ok(record) => {
                let redirect = results_path(&record.id);
                info!("Analysis complete for record {}", record.id);
                status.publish(&RunState::Succeeded {
                    record_id: record.id.clone(),
                    redirect: redirect.clone(),
                });
                RunOutcome::Completed {
                    record_id: record.id,
                    redirect,
                }
            }
            Err(failure) => {
                if failure.has_orphaned_uploads() {
                    warn!(
                        "Run halted at {:?} leaving orphaned uploads: {:?}",
                        failure.stage, failure.orphaned_uploads
                    );
                }
                status.publish(&RunState::Failed(failure.clone()));
                RunOutcome::Halted(failure)
            }
        }
    }

    async fn execute(
        &self,
        input: &SubmissionInput,
        document: &DocumentFile,
        ctx: &mut RunContext<'_>,
    ) -> Result<ResumeRecord, RunFailure> {
        ctx.enter(Stage::UploadingDocument);
        let uploaded_document = self.blobs.upload(document).await.map_err(|e| {
            error!("Document upload failed: {e}");
            ctx.halt(FailureKind::Upload, Some(e.to_string()))
        })?;
        ctx.uploads.push(uploaded_document.path.clone());

        ctx.enter(Stage::ConvertingToImage);
        let image = self.rasterizer.convert(document).await.map_err(|e| {
            error!("PDF conversion error: {e}");
            ctx.halt(FailureKind::Conversion, e.detail)
        })?;

        ctx.enter(Stage::UploadingImage);
        let uploaded_image = self.blobs.upload(&image).await.map_err(|e| {
            error!("Image upload failed: {e}");
            ctx.halt(FailureKind::Upload, Some(e.to_string()))
        })?;
        ctx.uploads.push(uploaded_image.path.clone());

        ctx.enter(Stage::PreparingData);
        let mut record = ResumeRecord::new(
            self.ids.generate_id(),
            uploaded_document.path,
            uploaded_image.path,
            input,
        );
        save_record(&*self.records, &record)
            .await
            .map_err(|e| {
                error!("Failed to persist record {}: {e}", record.id);
                ctx.halt(FailureKind::Persist, Some(e.to_string()))
            })?;
        ctx.record_id = Some(record.id.clone());
        info!("Persisted pending record {}", record.key());

        ctx.enter(Stage::Analyzing);
        let instructions = prepare_instructions(&input.job_title, &input.job_description);
        let response = self
            .analyzer
            .feedback(&record.resume_path, &instructions)
            .await
            .map_err(|e| {
                error!("Analysis failed for record {}: {e}", record.id);
                ctx.halt(FailureKind::Analysis, Some(e.to_string()))
            })?;

        let text = response.text().ok_or_else(|| {
            error!("Analysis for record {} returned no text", record.id);
            ctx.halt(FailureKind::Analysis, Some("response carried no text".to_string()))
        })?;

        let feedback = parse_feedback(text).map_err(|e| {
            error!("Unparseable feedback for record {}: {e}", record.id);
            ctx.halt(FailureKind::Parse, Some(e.to_string()))
        })?;

        record.feedback = Some(feedback);
        save_record(&*self.records, &record)
            .await
            .map_err(|e| {
                error!("Failed to persist feedback for record {}: {e}", record.id);
                ctx.halt(FailureKind::Persist, Some(e.to_string()))
            })?;

        Ok(record)
    }
}
