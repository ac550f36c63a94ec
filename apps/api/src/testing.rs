//! In-memory collaborators for tests. Every fake appends to one shared
//! [`EventLog`] so tests can assert the exact order of side effects.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::analysis::{AnalysisResponse, ResumeAnalyzer};
use crate::config::Config;
use crate::intake::IntakeGuard;
use crate::kv::{KvError, RecordStore};
use crate::llm_client::LlmError;
use crate::models::{DocumentFile, SubmissionInput};
use crate::pipeline::{IdGenerator, Pipeline, RunState, StatusBoard, StatusSink};
use crate::rasterize::{image_file_name, ConversionError, DocumentRasterizer};
use crate::state::AppState;
use crate::storage::{BlobStore, StorageError, StoredBlob};

pub const SAMPLE_PDF: &[u8] = b"%PDF-1.4\n1 0 obj << >> endobj\ntrailer << >>\n%%EOF\n";

pub fn sample_document() -> DocumentFile {
    DocumentFile::new("cv.pdf", "application/pdf", SAMPLE_PDF)
}

pub fn sample_submission() -> SubmissionInput {
    SubmissionInput {
        company_name: "Acme".to_string(),
        job_title: "Engineer".to_string(),
        job_description: "Build things".to_string(),
        document: Some(sample_document()),
    }
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Stores blobs under `uploads/<call index>/<file name>`.
pub struct MemoryBlobStore {
    log: EventLog,
    calls: AtomicUsize,
    fail_call: Option<usize>,
    objects: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new(log: EventLog, fail_call: Option<usize>) -> Self {
        Self {
            log,
            calls: AtomicUsize::new(0),
            fail_call,
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, file: &DocumentFile) -> Result<StoredBlob, StorageError> {
        self.log.push(format!("upload: {}", file.file_name));
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_call == Some(call) {
            return Err(StorageError::Upload("bucket unavailable".to_string()));
        }
        let path = format!("uploads/{call}/{}", file.file_name);
        self.objects
            .lock()
            .unwrap()
            .insert(path.clone(), file.bytes.clone());
        Ok(StoredBlob { path })
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

pub struct FakeRasterizer {
    log: EventLog,
    result: Result<(), ConversionError>,
}

#[async_trait]
impl DocumentRasterizer for FakeRasterizer {
    async fn convert(&self, document: &DocumentFile) -> Result<DocumentFile, ConversionError> {
        self.log.push(format!("convert: {}", document.file_name));
        self.result.clone()?;
        Ok(DocumentFile::new(
            image_file_name(&document.file_name),
            "image/png",
            &b"\x89PNG\r\n\x1a\n"[..],
        ))
    }
}

pub struct MemoryRecordStore {
    log: EventLog,
    fail_writes: bool,
    entries: Mutex<BTreeMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl MemoryRecordStore {
    pub fn new(log: EventLog) -> Self {
        Self::with_failing_writes(log, false)
    }

    pub fn with_failing_writes(log: EventLog, fail_writes: bool) -> Self {
        Self {
            log,
            fail_writes,
            entries: Mutex::new(BTreeMap::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Successful writes in order, as `(key, value)`.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.log.push(format!("set: {key}"));
        if self.fail_writes {
            return Err(KvError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            ))));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.value(key))
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

pub struct FakeAnalyzer {
    log: EventLog,
    response: Option<AnalysisResponse>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeAnalyzer {
    /// `(document_path, instructions)` per call.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResumeAnalyzer for FakeAnalyzer {
    async fn feedback(
        &self,
        document_path: &str,
        instructions: &str,
    ) -> Result<AnalysisResponse, LlmError> {
        self.log.push(format!("analyze: {document_path}"));
        self.calls
            .lock()
            .unwrap()
            .push((document_path.to_string(), instructions.to_string()));
        self.response.clone().ok_or(LlmError::EmptyContent)
    }
}

/// Yields `id-0`, `id-1`, ...
#[derive(Default)]
pub struct SequenceIds(AtomicUsize);

impl IdGenerator for SequenceIds {
    fn generate_id(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

pub struct RecordingSink {
    log: EventLog,
    states: Mutex<Vec<RunState>>,
}

impl RecordingSink {
    pub fn states(&self) -> Vec<RunState> {
        self.states.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<RunState> {
        self.states.lock().unwrap().last().cloned()
    }
}

impl StatusSink for RecordingSink {
    fn publish(&self, state: &RunState) {
        self.log.push(format!("status: {}", state.status_text()));
        self.states.lock().unwrap().push(state.clone());
    }
}

pub struct Behavior {
    pub fail_upload_call: Option<usize>,
    pub conversion: Result<(), ConversionError>,
    pub analysis: Option<AnalysisResponse>,
    pub fail_record_writes: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            fail_upload_call: None,
            conversion: Ok(()),
            analysis: Some(AnalysisResponse::from_text(r#"{"score": 80}"#)),
            fail_record_writes: false,
        }
    }
}

pub struct Harness {
    pub log: EventLog,
    pub blobs: Arc<MemoryBlobStore>,
    pub rasterizer: Arc<FakeRasterizer>,
    pub records: Arc<MemoryRecordStore>,
    pub analyzer: Arc<FakeAnalyzer>,
    pub ids: Arc<SequenceIds>,
    pub sink: RecordingSink,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(Behavior::default())
    }

    pub fn build(behavior: Behavior) -> Self {
        let log = EventLog::default();
        Self {
            blobs: Arc::new(MemoryBlobStore::new(log.clone(), behavior.fail_upload_call)),
            rasterizer: Arc::new(FakeRasterizer {
                log: log.clone(),
                result: behavior.conversion,
            }),
            records: Arc::new(MemoryRecordStore::with_failing_writes(
                log.clone(),
                behavior.fail_record_writes,
            )),
            analyzer: Arc::new(FakeAnalyzer {
                log: log.clone(),
                response: behavior.analysis,
                calls: Mutex::new(Vec::new()),
            }),
            ids: Arc::new(SequenceIds::default()),
            sink: RecordingSink {
                log: log.clone(),
                states: Mutex::new(Vec::new()),
            },
            log,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            self.blobs.clone(),
            self.rasterizer.clone(),
            self.records.clone(),
            self.analyzer.clone(),
            self.ids.clone(),
        )
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            pipeline: Arc::new(self.pipeline()),
            records: self.records.clone(),
            blobs: self.blobs.clone(),
            intake: IntakeGuard::default(),
            status: StatusBoard::default(),
            config: test_config(),
        }
    }
}

pub fn test_config() -> Config {
    Config {
        redis_url: "redis://127.0.0.1/".to_string(),
        s3_bucket: "resumes".to_string(),
        s3_endpoint: "http://127.0.0.1:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        anthropic_api_key: "test".to_string(),
        pdfium_library_path: None,
        render_scale: 1.0,
        max_upload_bytes: 1024,
        port: 0,
        rust_log: "debug".to_string(),
    }
}
