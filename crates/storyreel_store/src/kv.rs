//! Durable job store backed by a REST key-value service.

use crate::JobStore;
use serde_json::json;
use storyreel_core::{JobPatch, JobRecord};
use storyreel_error::{StoreError, StoreErrorKind, StoryreelResult};
use tokio::sync::Mutex;

/// Connection settings for the key-value service.
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Base URL of the KV REST API.
    pub base_url: String,
    /// Bearer token for the KV REST API.
    pub token: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl KvConfig {
    /// Read the KV connection settings from the environment.
    ///
    /// Reads `KV_REST_API_URL` and `KV_REST_API_TOKEN`; returns `None` when
    /// either is unset, which selects the in-memory backend.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("KV_REST_API_URL").ok()?;
        let token = std::env::var("KV_REST_API_TOKEN").ok()?;
        if base_url.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self {
            base_url,
            token,
            timeout_secs: 10,
        })
    }
}

/// Job store that persists records as JSON values under `job:<id>` keys in
/// an external key-value service, so jobs survive serverless invocations.
///
/// The KV API has no compare-and-swap, so merge updates are serialized
/// through a local mutex: each update reads the latest stored record,
/// applies the patch, and writes it back before the next update starts.
pub struct KvJobStore {
    config: KvConfig,
    client: reqwest::Client,
    write_lock: Mutex<()>,
}

impl KvJobStore {
    /// Create a store from connection settings.
    pub fn new(config: KvConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            write_lock: Mutex::new(()),
        }
    }

    fn key(job_id: &str) -> String {
        format!("job:{job_id}")
    }

    async fn set_raw(&self, key: &str, value: String) -> StoryreelResult<()> {
        let response = self
            .client
            .post(format!("{}/set", self.config.base_url))
            .bearer_auth(&self.config.token)
            .json(&json!([key, value]))
            .send()
            .await
            .map_err(|e| StoreError::new(StoreErrorKind::Http(format!("set {key}: {e}"))))?;

        if !response.status().is_success() {
            Err(StoreError::new(StoreErrorKind::Http(format!(
                "set {key}: status {}",
                response.status()
            ))))?;
        }
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> StoryreelResult<Option<String>> {
        let response = self
            .client
            .post(format!("{}/get", self.config.base_url))
            .bearer_auth(&self.config.token)
            .json(&json!([key]))
            .send()
            .await
            .map_err(|e| StoreError::new(StoreErrorKind::Http(format!("get {key}: {e}"))))?;

        if !response.status().is_success() {
            Err(StoreError::new(StoreErrorKind::Http(format!(
                "get {key}: status {}",
                response.status()
            ))))?;
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            StoreError::new(StoreErrorKind::Serialization(format!("get {key}: {e}")))
        })?;

        Ok(body
            .get("result")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    async fn del_raw(&self, key: &str) -> StoryreelResult<()> {
        let response = self
            .client
            .post(format!("{}/del", self.config.base_url))
            .bearer_auth(&self.config.token)
            .json(&json!([key]))
            .send()
            .await
            .map_err(|e| StoreError::new(StoreErrorKind::Http(format!("del {key}: {e}"))))?;

        if !response.status().is_success() {
            Err(StoreError::new(StoreErrorKind::Http(format!(
                "del {key}: status {}",
                response.status()
            ))))?;
        }
        Ok(())
    }

    fn encode(record: &JobRecord) -> StoryreelResult<String> {
        serde_json::to_string(record)
            .map_err(|e| StoreError::new(StoreErrorKind::Serialization(e.to_string())).into())
    }

    fn decode(raw: &str) -> StoryreelResult<JobRecord> {
        serde_json::from_str(raw)
            .map_err(|e| StoreError::new(StoreErrorKind::Serialization(e.to_string())).into())
    }
}

#[async_trait::async_trait]
impl JobStore for KvJobStore {
    #[tracing::instrument(skip(self, record), fields(job_id = %record.job_id))]
    async fn create(&self, record: JobRecord) -> StoryreelResult<()> {
        self.set_raw(&Self::key(&record.job_id), Self::encode(&record)?)
            .await
    }

    async fn get(&self, job_id: &str) -> StoryreelResult<Option<JobRecord>> {
        match self.get_raw(&Self::key(job_id)).await? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update(&self, job_id: &str, patch: JobPatch) -> StoryreelResult<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(raw) = self.get_raw(&Self::key(job_id)).await? else {
            tracing::warn!(job_id, "Update for unknown job");
            return Ok(false);
        };
        let mut record = Self::decode(&raw)?;
        patch.apply(&mut record);
        self.set_raw(&Self::key(job_id), Self::encode(&record)?)
            .await?;
        Ok(true)
    }

    async fn increment_scenes_completed(&self, job_id: &str) -> StoryreelResult<u32> {
        let _guard = self.write_lock.lock().await;
        let Some(raw) = self.get_raw(&Self::key(job_id)).await? else {
            return Err(StoreError::new(StoreErrorKind::UnknownJob(job_id.to_string())).into());
        };
        let mut record = Self::decode(&raw)?;
        record.progress.scenes_completed += 1;
        let completed = record.progress.scenes_completed;
        self.set_raw(&Self::key(job_id), Self::encode(&record)?)
            .await?;
        Ok(completed)
    }

    async fn remove(&self, job_id: &str) -> StoryreelResult<()> {
        self.del_raw(&Self::key(job_id)).await
    }
}
