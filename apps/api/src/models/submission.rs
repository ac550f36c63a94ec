use bytes::Bytes;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// A file travelling through the pipeline: the uploaded resume or its rendered image.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl DocumentFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the payload carries the PDF header.
    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(PDF_MAGIC)
    }
}

/// One user submission: job context plus the resume itself.
/// Text fields are passed through verbatim, empty or not.
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub document: Option<DocumentFile>,
}
