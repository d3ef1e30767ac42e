//! OpenAI REST client
//!
//! Each endpoint has a typed method and a `*_raw` twin that returns the
//! response body untouched, for callers that want to print the provider JSON.

use crate::config::OpenAIConfig;
use crate::error;
use crate::http::{create_headers, HttpClient, ReqwestClient};
use async_trait::async_trait;
use bytes::Bytes;
use psy_core::{
    Batch, ChatRequest, ChatResponse, CreateBatchRequest, Deleted, Error, FileHandle,
    FineTuneEvent, FineTuneJob, FineTuneRequest, Gateway, Model, Page, Result, COMMON_MODELS,
    FINE_TUNE_PURPOSE,
};
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// OpenAI API client
///
/// # Example
///
/// ```no_run
/// use psy_openai::{OpenAI, OpenAIConfig};
///
/// # async fn run() -> psy_core::Result<()> {
/// let client = OpenAI::new(OpenAIConfig::from_env()?)?;
/// for model in client.list_models().await? {
///     println!("{}", model.id);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OpenAI {
    client: Arc<dyn HttpClient>,
    config: OpenAIConfig,
    headers: HeaderMap,
    valid_models: Arc<RwLock<HashSet<String>>>,
}

impl OpenAI {
    /// Create a client backed by reqwest
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Arc::new(ReqwestClient::new(config.timeout)?);
        Self::with_client(config, client)
    }

    /// Create a client with a custom HTTP implementation
    pub fn with_client(config: OpenAIConfig, client: Arc<dyn HttpClient>) -> Result<Self> {
        let headers = create_headers(&config.api_key, config.organization_id.as_deref())?;
        let valid_models = COMMON_MODELS.iter().map(|m| (*m).to_string()).collect();
        Ok(Self {
            client,
            config,
            headers,
            valid_models: Arc::new(RwLock::new(valid_models)),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    async fn get_raw(&self, path: &str, query: &[(&str, String)]) -> Result<Bytes> {
        let url = self.url(path, query)?;
        debug!(method = "GET", path, "openai request");
        let body = self.client.get(&url, self.headers.clone()).await?;
        trace!(bytes = body.len(), "openai response");
        Ok(body)
    }

    async fn post_raw<B: Serialize + Sync>(&self, path: &str, body: Option<&B>) -> Result<Bytes> {
        let url = self.url(path, &[])?;
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(error::serialization_error)?;
        debug!(method = "POST", path, "openai request");
        trace!(body = ?body, "openai request body");
        let body = self.client.post(&url, self.headers.clone(), body).await?;
        trace!(bytes = body.len(), "openai response");
        Ok(body)
    }

    async fn delete_raw(&self, path: &str) -> Result<Bytes> {
        let url = self.url(path, &[])?;
        debug!(method = "DELETE", path, "openai request");
        self.client.delete(&url, self.headers.clone()).await
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let base = self.config.url(path);
        let query: Vec<_> = query.iter().filter(|(_, v)| !v.is_empty()).collect();
        if query.is_empty() {
            return Ok(base);
        }
        Url::parse_with_params(&base, query.iter().map(|(k, v)| (*k, v.as_str())))
            .map(String::from)
            .map_err(|e| Error::Configuration(format!("invalid URL {base}: {e}")))
    }

    // Models

    /// List available models, oldest first
    pub async fn list_models(&self) -> Result<Vec<Model>> {
        let mut page: Page<Model> = decode(&self.list_models_raw().await?)?;
        page.data.sort_by_key(|m| m.created);
        Ok(page.data)
    }

    /// List available models as raw JSON
    pub async fn list_models_raw(&self) -> Result<Bytes> {
        self.get_raw("/models", &[]).await
    }

    /// Read one model
    pub async fn read_model(&self, model_id: &str) -> Result<Model> {
        decode(&self.read_model_raw(model_id).await?)
    }

    /// Read one model as raw JSON
    pub async fn read_model_raw(&self, model_id: &str) -> Result<Bytes> {
        self.get_raw(&format!("/models/{model_id}"), &[]).await
    }

    /// Delete a fine-tuned model
    pub async fn delete_model(&self, model_id: &str) -> Result<Deleted> {
        let deleted = decode(&self.delete_model_raw(model_id).await?)?;
        self.valid_models.write().await.remove(model_id);
        Ok(deleted)
    }

    /// Delete a fine-tuned model, returning raw JSON
    pub async fn delete_model_raw(&self, model_id: &str) -> Result<Bytes> {
        self.delete_raw(&format!("/models/{model_id}")).await
    }

    // Files

    /// List uploaded files, optionally filtered by purpose, sorted by name
    pub async fn list_files(&self, purpose: Option<&str>) -> Result<Vec<FileHandle>> {
        let mut page: Page<FileHandle> = decode(&self.list_files_raw(purpose).await?)?;
        page.data.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(page.data)
    }

    /// List uploaded files as raw JSON
    pub async fn list_files_raw(&self, purpose: Option<&str>) -> Result<Bytes> {
        let query = [("purpose", purpose.unwrap_or_default().to_string())];
        self.get_raw("/files", &query).await
    }

    /// Read one file's metadata
    pub async fn read_file(&self, file_id: &str) -> Result<FileHandle> {
        decode(&self.read_file_raw(file_id).await?)
    }

    /// Read one file's metadata as raw JSON
    pub async fn read_file_raw(&self, file_id: &str) -> Result<Bytes> {
        self.get_raw(&format!("/files/{file_id}"), &[]).await
    }

    /// Upload file content; an empty purpose means "fine-tune"
    pub async fn upload_file_raw(&self, name: &str, purpose: &str, content: Vec<u8>) -> Result<Bytes> {
        let purpose = if purpose.is_empty() {
            FINE_TUNE_PURPOSE
        } else {
            purpose
        };
        let form = Form::new()
            .text("purpose", purpose.to_string())
            .part("file", Part::bytes(content).file_name(name.to_string()));
        let url = self.url("/files", &[])?;
        debug!(method = "POST", path = "/files", name, purpose, "openai upload");
        self.client
            .post_multipart(&url, self.headers.clone(), form)
            .await
    }

    /// Download a file's content
    pub async fn download_file_raw(&self, file_id: &str) -> Result<Bytes> {
        self.get_raw(&format!("/files/{file_id}/content"), &[])
            .await
    }

    /// Delete an uploaded file
    pub async fn delete_file(&self, file_id: &str) -> Result<Deleted> {
        decode(&self.delete_file_raw(file_id).await?)
    }

    /// Delete an uploaded file, returning raw JSON
    pub async fn delete_file_raw(&self, file_id: &str) -> Result<Bytes> {
        self.delete_raw(&format!("/files/{file_id}")).await
    }

    // Batches

    /// Create a batch job, returning raw JSON
    pub async fn create_batch_raw(&self, request: &CreateBatchRequest) -> Result<Bytes> {
        self.post_raw("/batches", Some(request)).await
    }

    /// List batch jobs, newest first; `after` is the cursor from a previous page
    pub async fn list_batches(&self, limit: u32, after: Option<&str>) -> Result<Page<Batch>> {
        decode(&self.list_batches_raw(limit, after).await?)
    }

    /// List batch jobs as raw JSON
    pub async fn list_batches_raw(&self, limit: u32, after: Option<&str>) -> Result<Bytes> {
        let query = [
            ("limit", limit.to_string()),
            ("after", after.unwrap_or_default().to_string()),
        ];
        self.get_raw("/batches", &query).await
    }

    /// Read a batch job as raw JSON
    pub async fn read_batch_raw(&self, batch_id: &str) -> Result<Bytes> {
        self.get_raw(&format!("/batches/{batch_id}"), &[]).await
    }

    /// Cancel a batch job
    pub async fn cancel_batch(&self, batch_id: &str) -> Result<Batch> {
        decode(&self.cancel_batch_raw(batch_id).await?)
    }

    /// Cancel a batch job, returning raw JSON
    pub async fn cancel_batch_raw(&self, batch_id: &str) -> Result<Bytes> {
        self.post_raw::<()>(&format!("/batches/{batch_id}/cancel"), None)
            .await
    }

    // Fine-tuning

    /// Create a fine-tuning job
    pub async fn create_fine_tune(&self, request: &FineTuneRequest) -> Result<FineTuneJob> {
        decode(&self.create_fine_tune_raw(request).await?)
    }

    /// Create a fine-tuning job, returning raw JSON
    pub async fn create_fine_tune_raw(&self, request: &FineTuneRequest) -> Result<Bytes> {
        self.post_raw("/fine_tuning/jobs", Some(request)).await
    }

    /// List fine-tuning jobs
    pub async fn list_fine_tunes(&self, limit: u32, after: Option<&str>) -> Result<Page<FineTuneJob>> {
        decode(&self.list_fine_tunes_raw(limit, after).await?)
    }

    /// List fine-tuning jobs as raw JSON
    pub async fn list_fine_tunes_raw(&self, limit: u32, after: Option<&str>) -> Result<Bytes> {
        let query = [
            ("limit", limit.to_string()),
            ("after", after.unwrap_or_default().to_string()),
        ];
        self.get_raw("/fine_tuning/jobs", &query).await
    }

    /// Read a fine-tuning job
    pub async fn read_fine_tune(&self, job_id: &str) -> Result<FineTuneJob> {
        decode(&self.read_fine_tune_raw(job_id).await?)
    }

    /// Read a fine-tuning job as raw JSON
    pub async fn read_fine_tune_raw(&self, job_id: &str) -> Result<Bytes> {
        self.get_raw(&format!("/fine_tuning/jobs/{job_id}"), &[])
            .await
    }

    /// List a fine-tuning job's events
    pub async fn list_fine_tune_events(&self, job_id: &str, limit: u32) -> Result<Page<FineTuneEvent>> {
        decode(&self.list_fine_tune_events_raw(job_id, limit).await?)
    }

    /// List a fine-tuning job's events as raw JSON
    pub async fn list_fine_tune_events_raw(&self, job_id: &str, limit: u32) -> Result<Bytes> {
        let query = [("limit", limit.to_string())];
        self.get_raw(&format!("/fine_tuning/jobs/{job_id}/events"), &query)
            .await
    }

    /// Cancel a fine-tuning job
    pub async fn cancel_fine_tune(&self, job_id: &str) -> Result<FineTuneJob> {
        decode(&self.cancel_fine_tune_raw(job_id).await?)
    }

    /// Cancel a fine-tuning job, returning raw JSON
    pub async fn cancel_fine_tune_raw(&self, job_id: &str) -> Result<Bytes> {
        self.post_raw::<()>(&format!("/fine_tuning/jobs/{job_id}/cancel"), None)
            .await
    }

    // Chat

    /// Request a chat completion, returning raw JSON
    pub async fn complete_chat_raw(&self, request: &ChatRequest) -> Result<Bytes> {
        self.post_raw("/chat/completions", Some(request)).await
    }
}

#[async_trait]
impl Gateway for OpenAI {
    async fn is_valid_model(&self, model: &str) -> bool {
        if model.is_empty() {
            return false;
        }
        if self.valid_models.read().await.contains(model) {
            return true;
        }
        match self.read_model(model).await {
            Ok(found) => {
                self.valid_models.write().await.insert(found.id);
                true
            }
            Err(e) => {
                debug!(model, error = %e, "model lookup failed");
                false
            }
        }
    }

    async fn upload_file(&self, name: &str, purpose: &str, content: Vec<u8>) -> Result<FileHandle> {
        decode(&self.upload_file_raw(name, purpose, content).await?)
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        Ok(self.download_file_raw(file_id).await?.to_vec())
    }

    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<Batch> {
        decode(&self.create_batch_raw(request).await?)
    }

    async fn read_batch(&self, batch_id: &str) -> Result<Batch> {
        decode(&self.read_batch_raw(batch_id).await?)
    }

    async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        decode(&self.complete_chat_raw(request).await?)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(error::serialization_error)
}
