//! Intake: collect a submission from the upload form and make sure only one
//! run is in flight at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::Multipart;
use tracing::debug;

use crate::errors::AppError;
use crate::models::{DocumentFile, SubmissionInput};

pub mod handlers;

pub const FIELD_COMPANY_NAME: &str = "company-name";
pub const FIELD_JOB_TITLE: &str = "job-title";
pub const FIELD_JOB_DESCRIPTION: &str = "job-description";
pub const FIELD_FILE: &str = "file";

/// Process-local busy flag. Holding a [`RunPermit`] means a run is in flight.
#[derive(Clone, Default)]
pub struct IntakeGuard {
    busy: Arc<AtomicBool>,
}

impl IntakeGuard {
    /// Returns `None` while another run holds the permit.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                busy: self.busy.clone(),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears the busy flag when dropped, i.e. when the run reaches a terminal state.
pub struct RunPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Reads the upload form. An empty file part counts as no file.
pub async fn read_submission(
    multipart: &mut Multipart,
    max_upload_bytes: usize,
) -> Result<SubmissionInput, AppError> {
    let mut input = SubmissionInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FIELD_COMPANY_NAME | FIELD_JOB_TITLE | FIELD_JOB_DESCRIPTION => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable field {name}: {e}")))?;
                match name.as_str() {
                    FIELD_COMPANY_NAME => input.company_name = value,
                    FIELD_JOB_TITLE => input.job_title = value,
                    _ => input.job_description = value,
                }
            }
            FIELD_FILE => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable file: {e}")))?;
                if bytes.len() > max_upload_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "Resume is {} bytes; the limit is {max_upload_bytes}",
                        bytes.len()
                    )));
                }
                let document = DocumentFile::new(file_name, content_type, bytes);
                if !document.is_empty() {
                    input.document = Some(document);
                }
            }
            other => debug!("Ignoring unknown form field '{other}'"),
        }
    }

    Ok(input)
}

/// A submission may only start with a PDF attached: declared as one by name or
/// content type, and carrying the PDF header. Text fields are not checked.
pub fn validate(input: &SubmissionInput) -> Result<(), AppError> {
    let document = input
        .document
        .as_ref()
        .ok_or_else(|| AppError::Validation("A resume file is required".to_string()))?;

    let named_pdf = document.file_name.to_ascii_lowercase().ends_with(".pdf");
    let typed_pdf = document.content_type == "application/pdf";
    if !(named_pdf || typed_pdf) || !document.is_pdf() {
        return Err(AppError::Validation(format!(
            "{} is not a PDF; upload your resume as a PDF",
            document.file_name
        )));
    }
    Ok(())
}
