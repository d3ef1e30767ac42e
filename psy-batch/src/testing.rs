//! An in-memory [`Gateway`] for exercising the pipeline without a network

use async_trait::async_trait;
use psy_core::{
    Batch, BatchStatus, ChatRequest, ChatResponse, CreateBatchRequest, Error, FileHandle,
    Gateway, Message, MessageChoice, Result, Usage, COMMON_MODELS,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Reply = Box<dyn Fn(&ChatRequest) -> String + Send + Sync>;

#[derive(Default)]
struct State {
    chat_calls: usize,
    attempts: HashMap<String, usize>,
    files: HashMap<String, Vec<u8>>,
    uploads: Vec<(String, String, Vec<u8>)>,
    batches: HashMap<String, Batch>,
    advances: HashMap<String, BatchStatus>,
}

/// Scripted gateway: canned replies, selectable failures, stored files and batches
///
/// Chats are identified by their request's user tag, which the pipeline sets
/// to the chat ID.
pub struct MockGateway {
    models: HashSet<String>,
    reply: Reply,
    fail_first: HashSet<String>,
    fail_always: HashSet<String>,
    state: Mutex<State>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// A gateway that knows the common models and replies "Score: 3"
    pub fn new() -> Self {
        Self {
            models: COMMON_MODELS.iter().map(ToString::to_string).collect(),
            reply: Box::new(|_| "Score: 3".to_string()),
            fail_first: HashSet::new(),
            fail_always: HashSet::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Compute each completion from its request
    pub fn with_reply(mut self, reply: impl Fn(&ChatRequest) -> String + Send + Sync + 'static) -> Self {
        self.reply = Box::new(reply);
        self
    }

    /// Fail these chats on their first attempt only
    pub fn fail_first_attempt(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.fail_first.extend(ids);
        self
    }

    /// Fail these chats on every attempt
    pub fn fail_always(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.fail_always.extend(ids);
        self
    }

    /// Serve `content` as the file `file_id`
    pub fn with_file(self, file_id: &str, content: impl Into<Vec<u8>>) -> Self {
        self.lock().files.insert(file_id.to_string(), content.into());
        self
    }

    /// Serve `batch` from [`Gateway::read_batch`]
    pub fn with_batch(self, batch: Batch) -> Self {
        self.lock().batches.insert(batch.id.clone(), batch);
        self
    }

    /// Move a batch to `status` after its next read
    pub fn advance_on_read(&self, batch_id: &str, status: BatchStatus) {
        self.lock().advances.insert(batch_id.to_string(), status);
    }

    /// Complete a batch with `content` as its output file
    pub fn finish_batch(&self, batch_id: &str, file_id: &str, content: impl Into<Vec<u8>>) {
        let mut state = self.lock();
        state.files.insert(file_id.to_string(), content.into());
        if let Some(batch) = state.batches.get_mut(batch_id) {
            batch.status = BatchStatus::Completed;
            batch.output_file_id = Some(file_id.to_string());
        }
    }

    /// Number of chat completion calls received
    pub fn chat_calls(&self) -> usize {
        self.lock().chat_calls
    }

    /// Uploaded files as (name, purpose, content), in upload order
    pub fn uploads(&self) -> Vec<(String, String, Vec<u8>)> {
        self.lock().uploads.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn is_valid_model(&self, model: &str) -> bool {
        self.models.contains(model)
    }

    async fn upload_file(&self, name: &str, purpose: &str, content: Vec<u8>) -> Result<FileHandle> {
        let mut state = self.lock();
        let id = format!("file-{}", state.uploads.len() + 1);
        let bytes = content.len() as u64;
        state.files.insert(id.clone(), content.clone());
        state
            .uploads
            .push((name.to_string(), purpose.to_string(), content));
        Ok(FileHandle {
            id,
            object: "file".to_string(),
            bytes,
            created_at: 0,
            filename: name.to_string(),
            purpose: purpose.to_string(),
        })
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.lock()
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("file {file_id}")))
    }

    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<Batch> {
        let mut state = self.lock();
        let batch = Batch {
            id: format!("batch_{}", state.batches.len() + 1),
            object: "batch".to_string(),
            endpoint: request.endpoint.clone(),
            input_file_id: request.input_file_id.clone(),
            completion_window: request.completion_window.clone(),
            status: BatchStatus::Validating,
            metadata: request.metadata.clone(),
            ..Default::default()
        };
        state.batches.insert(batch.id.clone(), batch.clone());
        Ok(batch)
    }

    async fn read_batch(&self, batch_id: &str) -> Result<Batch> {
        let mut state = self.lock();
        let advance = state.advances.remove(batch_id);
        let batch = state
            .batches
            .get_mut(batch_id)
            .ok_or_else(|| Error::NotFound(format!("batch {batch_id}")))?;
        let current = batch.clone();
        if let Some(status) = advance {
            batch.status = status;
        }
        Ok(current)
    }

    async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let id = request.user.clone().unwrap_or_default();
        let attempt = {
            let mut state = self.lock();
            state.chat_calls += 1;
            let attempt = state.attempts.entry(id.clone()).or_default();
            *attempt += 1;
            *attempt
        };
        if self.fail_always.contains(&id) || (attempt == 1 && self.fail_first.contains(&id)) {
            return Err(Error::Api {
                status: 500,
                kind: "server_error".to_string(),
                message: format!("mock failure for {id}"),
            });
        }
        Ok(ChatResponse {
            id: format!("chatcmpl-{id}"),
            object: "chat.completion".to_string(),
            model: request.model.clone(),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            choices: vec![MessageChoice {
                message: Message::assistant((self.reply)(request)),
                index: 0,
                finish_reason: Some("stop".to_string()),
            }],
            ..Default::default()
        })
    }
}
