//! Core types for the psy toolkit
//!
//! This crate holds the wire types shared by the provider gateway and the
//! batch pipeline, the common [`Error`] type, and the [`Gateway`] trait that
//! the pipeline uses to reach the remote API.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod gateway;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use types::{
    batch::{
        format_elapsed, Batch, BatchErrorDetail, BatchErrorList, BatchItemResponse,
        BatchRequestItem, BatchResponseItem, BatchStatus, CreateBatchRequest, RequestCounts,
        CHAT_COMPLETIONS_ENDPOINT, COMPLETION_WINDOW,
    },
    chat::{ChatRequest, ChatResponse, MessageChoice, Usage},
    file::{FileHandle, BATCH_PURPOSE, FINE_TUNE_PURPOSE},
    fine_tune::{
        FineTuneError, FineTuneEvent, FineTuneJob, FineTuneMetric, FineTuneRecord,
        FineTuneRequest, HyperParameters,
    },
    message::{Message, Role},
    model::{Model, COMMON_MODELS},
    Deleted, Page,
};
