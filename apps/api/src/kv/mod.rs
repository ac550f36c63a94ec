//! Key-value persistence for resume records.

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::resume::{resume_key, ResumeRecord, RESUME_KEY_PREFIX};

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Minimal string key-value contract used by the pipeline and the results API.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// All keys starting with `prefix`, sorted.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, KvError>;
}

pub struct RedisRecordStore {
    client: redis::Client,
}

impl RedisRecordStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(key, value).await?;
        debug!("SET {key} ({} bytes)", value.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut keys = Vec::new();
        let mut iter = conn.scan_match::<_, String>(format!("{prefix}*")).await?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        keys.sort();
        Ok(keys)
    }
}

/// Writes the full record under `resume:<id>`, replacing any previous version.
pub async fn save_record(store: &dyn RecordStore, record: &ResumeRecord) -> Result<(), KvError> {
    let value = record.to_json()?;
    store.set(&record.key(), &value).await
}

pub async fn load_record(store: &dyn RecordStore, id: &str) -> Result<Option<ResumeRecord>, KvError> {
    match store.get(&resume_key(id)).await? {
        Some(raw) => Ok(Some(ResumeRecord::from_json(&raw)?)),
        None => Ok(None),
    }
}

/// Every readable record. Undecodable values are logged and skipped.
pub async fn list_records(store: &dyn RecordStore) -> Result<Vec<ResumeRecord>, KvError> {
    let mut records = Vec::new();
    for key in store.keys(RESUME_KEY_PREFIX).await? {
        let Some(raw) = store.get(&key).await? else {
            continue;
        };
        match ResumeRecord::from_json(&raw) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping unreadable record {key}: {e}"),
        }
    }
    Ok(records)
}
