//! Templated chat-completion runs over tabular data
//!
//! A run reads an answer table, resolves a prompt template for each row and
//! sends the resulting chats either concurrently ([`run_parallel`]) or as a
//! provider batch job ([`submit_batch`], later [`process_batch_results`]).
//! Completions and the scores extracted from them are written back onto the
//! table, joined by each row's `chatID`.

mod batch;
mod builder;
mod chat;
mod error;
mod merge;
mod parallel;
mod params;
mod score;
mod template;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use batch::{
    encode_requests, parse_response_lines, poll_batch, process_batch_results,
    read_batch_responses, reconcile, submit_batch, BatchResults, Submission,
};
pub use builder::{build_chats, build_requests, CHAT_ID_FIELD};
pub use chat::{new_chat_id, Chat};
pub use error::{BatchError, BatchResult};
pub use merge::{merge_outcomes, score_column, MergeSummary, Outcome, COMPLETION_FIELD};
pub use parallel::{
    batches, complete_batch, complete_chat, execute, outcomes, run_parallel, BatchProgress,
    RunEvent, RunSummary, FALLBACK_MODEL,
};
pub use params::{
    keys, ChatParameters, RowSelection, DEFAULT_BATCH_SIZE, DEFAULT_MODEL, DEFAULT_SCORE_FIELD,
};
pub use score::{format_score, parse_score, select_scores, Selection};
pub use template::{QuestionSource, Template, ANSWER_MARKER, QUESTION_MARKER};

/// Prelude module for convenient imports
pub mod prelude {
    pub use super::{build_requests, run_parallel, submit_batch, Chat, ChatParameters, Selection};
    pub use psy_core::Gateway;
}
