//! The remote API operations the batch pipeline depends on

use crate::error::Result;
use crate::types::batch::{Batch, CreateBatchRequest};
use crate::types::chat::{ChatRequest, ChatResponse};
use crate::types::file::FileHandle;
use async_trait::async_trait;

/// Remote API gateway used by the completion pipeline
///
/// Implementations wrap a hosted provider's REST API. The pipeline only needs
/// this subset; the concrete client exposes the full surface.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Whether the provider recognizes the model ID
    ///
    /// Implementations may cache known-valid IDs for the life of the process.
    async fn is_valid_model(&self, model: &str) -> bool;

    /// Upload file content under `name` with the given purpose
    async fn upload_file(&self, name: &str, purpose: &str, content: Vec<u8>)
        -> Result<FileHandle>;

    /// Download the content of a previously uploaded or generated file
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Create a batch job over an uploaded input file
    async fn create_batch(&self, request: &CreateBatchRequest) -> Result<Batch>;

    /// Read the current state of a batch job
    async fn read_batch(&self, batch_id: &str) -> Result<Batch>;

    /// Request a single chat completion
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
