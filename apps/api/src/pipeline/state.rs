use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::rasterize::describe_detail;

/// A step of the pipeline that awaits a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    UploadingDocument,
    ConvertingToImage,
    UploadingImage,
    PreparingData,
    Analyzing,
}

impl Stage {
    pub fn status_text(self) -> &'static str {
        match self {
            Stage::UploadingDocument => "Uploading the file...",
            Stage::ConvertingToImage => "Converting to image...",
            Stage::UploadingImage => "Uploading the image...",
            Stage::PreparingData => "Preparing data...",
            Stage::Analyzing => "Analyzing...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Upload,
    Conversion,
    Persist,
    Analysis,
    Parse,
}

/// Why and where a run halted, plus what it left behind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub stage: Stage,
    pub detail: Option<String>,
    /// Blobs uploaded before the halt. Never cleaned up here; reconcile out-of-band.
    pub orphaned_uploads: Vec<String>,
    /// Set once the first version of the record has been persisted.
    pub record_id: Option<String>,
}

impl RunFailure {
    pub fn status_text(&self) -> String {
        match self.kind {
            FailureKind::Upload if self.stage == Stage::UploadingImage => {
                "Error while uploading the image".to_string()
            }
            FailureKind::Upload => "Error while uploading the file".to_string(),
            FailureKind::Conversion => format!(
                "Error while converting to image: {}",
                describe_detail(self.detail.as_deref())
            ),
            FailureKind::Persist => "Error while saving the resume record".to_string(),
            FailureKind::Analysis => "Error: Failed to analyze resume".to_string(),
            FailureKind::Parse => "Error: Failed to parse resume feedback".to_string(),
        }
    }

    pub fn has_orphaned_uploads(&self) -> bool {
        !self.orphaned_uploads.is_empty()
    }
}

/// Observable state of the current run. Callers branch on this, not on status text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running {
        stage: Stage,
    },
    Failed(RunFailure),
    Succeeded {
        record_id: String,
        redirect: String,
    },
}

impl RunState {
    pub fn status_text(&self) -> String {
        match self {
            RunState::Idle => String::new(),
            RunState::Running { stage } => stage.status_text().to_string(),
            RunState::Failed(failure) => failure.status_text(),
            RunState::Succeeded { .. } => "Analysis complete, redirecting...".to_string(),
        }
    }

    #[cfg(test)]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Failed(_) | RunState::Succeeded { .. })
    }
}

/// Receives every state change synchronously, before the next await.
pub trait StatusSink: Send + Sync {
    fn publish(&self, state: &RunState);
}

/// Latest published state, shared between the running pipeline and the HTTP layer.
#[derive(Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<RunState>>,
}

impl StatusBoard {
    pub fn current(&self) -> RunState {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn reset(&self) {
        self.publish(&RunState::Idle);
    }
}

impl StatusSink for StatusBoard {
    fn publish(&self, state: &RunState) {
        let mut current = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = state.clone();
    }
}
