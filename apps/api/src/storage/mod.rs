//! Blob storage for uploaded resumes and their rendered images.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::DocumentFile;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 upload failed: {0}")]
    Upload(String),

    #[error("S3 download failed: {0}")]
    Download(String),

    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Locator of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub path: String,
}

/// Upload/download seam. Carried in `AppState` as `Arc<dyn BlobStore>`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores one file and returns its stable locator.
    async fn upload(&self, file: &DocumentFile) -> Result<StoredBlob, StorageError>;

    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;
}

/// S3 / MinIO backed blob store.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, file: &DocumentFile) -> Result<StoredBlob, StorageError> {
        let key = object_key(&file.file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.to_vec()))
            .content_type(&file.content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload(format!("{e}")))?;

        info!(
            "Uploaded {} bytes to s3://{}/{}",
            file.len(),
            self.bucket,
            key
        );
        Ok(StoredBlob { path: key })
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()) == Some(true) {
                    StorageError::NotFound(path.to_string())
                } else {
                    StorageError::Download(format!("{e}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Download(format!("{e}")))?;

        Ok(data.into_bytes())
    }
}

/// Object keys are unique per upload so re-submitting the same file never overwrites.
fn object_key(file_name: &str) -> String {
    format!("uploads/{}/{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
