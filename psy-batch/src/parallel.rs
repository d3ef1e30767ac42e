//! Concurrent execution of chat completions

use crate::chat::{new_chat_id, Chat};
use crate::error::{BatchError, BatchResult};
use crate::merge::{merge_outcomes, MergeSummary, Outcome};
use crate::params::ChatParameters;
use crate::score::Selection;
use futures::future::join_all;
use psy_core::{format_elapsed, Gateway};
use psy_table::Table;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Model used by [`complete_chat`] when the chat names none
pub const FALLBACK_MODEL: &str = "gpt-4";

/// Complete every chat concurrently and wait for all of them
///
/// One task is spawned per chat; nothing is returned until every task has
/// finished. Failures are recorded on their chat, not retried. A task that
/// panics yields its chat as a failure.
pub async fn complete_batch<G>(
    gateway: Arc<G>,
    chats: Vec<Chat>,
    selection: Selection,
) -> HashMap<String, Chat>
where
    G: Gateway + ?Sized + 'static,
{
    let pending = chats.clone();
    let handles: Vec<_> = chats
        .into_iter()
        .map(|mut chat| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                let result = gateway.complete_chat(&chat.request).await;
                chat.resolve(result, selection, start.elapsed());
                chat
            })
        })
        .collect();

    let results = join_all(handles).await;
    results
        .into_iter()
        .zip(pending)
        .map(|(result, mut fallback)| {
            let chat = result.unwrap_or_else(|e| {
                fallback.resolve(
                    Err(psy_core::Error::state(format!("completion task failed: {e}"))),
                    selection,
                    Duration::ZERO,
                );
                fallback
            });
            (chat.id.clone(), chat)
        })
        .collect()
}

/// Split items into consecutive groups of at most `size`
///
/// A size of zero puts everything in one group.
pub fn batches<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    if size == 0 {
        return vec![items];
    }
    let mut groups = Vec::with_capacity(items.len().div_ceil(size));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        groups.push(items.by_ref().take(size).collect());
    }
    groups
}

/// Progress after one sub-batch of a parallel run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    /// 1-based sub-batch number
    pub batch: usize,
    /// Number of sub-batches
    pub batches: usize,
    /// Chats in this sub-batch
    pub size: usize,
    /// Chats finished so far
    pub completed: usize,
    /// Chats in the run
    pub total: usize,
    /// Time spent on this sub-batch
    pub batch_elapsed: Duration,
    /// Time since the run started
    pub elapsed: Duration,
}

impl BatchProgress {
    /// Mean time per finished chat
    pub fn average(&self) -> Duration {
        u32::try_from(self.completed)
            .ok()
            .filter(|n| *n > 0)
            .map_or(Duration::ZERO, |n| self.elapsed / n)
    }

    /// Share of chats finished, as a percentage
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f32 / self.total as f32 * 100.0
    }

    /// Extrapolated time until the last chat finishes
    pub fn remaining(&self) -> Duration {
        let left = u32::try_from(self.total.saturating_sub(self.completed)).unwrap_or(u32::MAX);
        self.average() * left
    }
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} of {}: {} chats in {}, {} avg, {:.2}% complete, {} remaining",
            self.batch,
            self.batches,
            self.size,
            format_elapsed(self.batch_elapsed),
            format_elapsed(self.average()),
            self.percent(),
            format_elapsed(self.remaining())
        )
    }
}

/// Something a parallel run reports as it goes
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// The run is starting
    Started {
        /// Chats in the run
        chats: usize,
        /// Number of sub-batches
        batches: usize,
        /// Sub-batch size
        size: usize,
    },
    /// One chat finished; `count` is its position in finishing order
    Chat {
        /// Running count
        count: usize,
        /// The finished chat
        chat: &'a Chat,
    },
    /// One sub-batch finished
    Progress(&'a BatchProgress),
    /// The retry pass is starting
    Retrying(usize),
}

/// Totals for a parallel run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Chats dispatched
    pub chats: usize,
    /// Chats retried after failing the first pass
    pub retried: usize,
    /// Rows written with an error instead of a completion
    pub errors: usize,
    /// Wall-clock time for the run
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "completed {} chat completions ({} errors) in {}",
            self.chats,
            self.errors,
            format_elapsed(self.elapsed)
        )
    }
}

/// Run chats in sub-batches, then retry every failure once
///
/// Sub-batches run one after another; the chats within one run
/// concurrently. After the last sub-batch, all failed chats are sent again
/// in one more concurrent batch, and their new outcomes replace the old.
pub async fn execute<G, F>(
    gateway: Arc<G>,
    chats: Vec<Chat>,
    batch_size: usize,
    selection: Selection,
    mut on_event: F,
) -> (HashMap<String, Chat>, usize)
where
    G: Gateway + ?Sized + 'static,
    F: FnMut(RunEvent<'_>),
{
    let start = Instant::now();
    let total = chats.len();
    let groups = batches(chats, batch_size);
    let group_count = groups.len();
    on_event(RunEvent::Started {
        chats: total,
        batches: group_count,
        size: batch_size,
    });

    let mut results = HashMap::with_capacity(total);
    let mut retries = Vec::new();
    let mut count = 0;
    for (i, group) in groups.into_iter().enumerate() {
        let group_start = Instant::now();
        let size = group.len();
        for (_, chat) in complete_batch(gateway.clone(), group, selection).await {
            count += 1;
            on_event(RunEvent::Chat { count, chat: &chat });
            if chat.is_failed() {
                warn!(chat_id = %chat.id, millis = chat.millis, error = ?chat.error, "chat failed");
                retries.push(chat.clone());
            }
            results.insert(chat.id.clone(), chat);
        }
        let progress = BatchProgress {
            batch: i + 1,
            batches: group_count,
            size,
            completed: count,
            total,
            batch_elapsed: group_start.elapsed(),
            elapsed: start.elapsed(),
        };
        info!(batch = progress.batch, completed = count, total, "sub-batch finished");
        on_event(RunEvent::Progress(&progress));
    }

    let retried = retries.len();
    if retried > 0 {
        on_event(RunEvent::Retrying(retried));
        info!(retried, "retrying failed chats");
        let mut retry_count = 0;
        for (id, chat) in complete_batch(gateway, retries, selection).await {
            retry_count += 1;
            on_event(RunEvent::Chat {
                count: retry_count,
                chat: &chat,
            });
            results.insert(id, chat);
        }
    }
    (results, retried)
}

/// Convert finished chats into table outcomes; pending chats are skipped
pub fn outcomes(results: &HashMap<String, Chat>) -> HashMap<String, Outcome> {
    results
        .iter()
        .filter_map(|(id, chat)| {
            let outcome = match chat.completion()? {
                Ok(text) => Outcome::success(text, chat.scores.clone()),
                Err(error) => Outcome::failure(error),
            };
            Some((id.clone(), outcome))
        })
        .collect()
}

/// Run chats built from `table` and write the merged results to the output file
///
/// # Errors
///
/// Fails only when the output file cannot be written; completion failures
/// are written as row errors and counted in the summary.
pub async fn run_parallel<G, F>(
    gateway: Arc<G>,
    chats: Vec<Chat>,
    table: &mut Table,
    params: &ChatParameters,
    on_event: F,
) -> BatchResult<RunSummary>
where
    G: Gateway + ?Sized + 'static,
    F: FnMut(RunEvent<'_>),
{
    let start = Instant::now();
    let dispatched = chats.len();
    let (results, retried) = execute(
        gateway,
        chats,
        params.batch_size,
        params.score_select,
        on_event,
    )
    .await;
    let MergeSummary { errors, .. } =
        merge_outcomes(table, &outcomes(&results), &params.score_field);
    table.write(&params.output_file)?;
    let summary = RunSummary {
        chats: dispatched,
        retried,
        errors,
        elapsed: start.elapsed(),
    };
    info!(
        chats = summary.chats,
        errors = summary.errors,
        output = %params.output_file,
        "parallel run written"
    );
    Ok(summary)
}

/// Complete one chat, validating it first
///
/// A missing ID is minted and a blank model falls back to "gpt-4". A failed
/// completion call is not an error here; it is recorded on the returned chat.
///
/// # Errors
///
/// Fails when the prompt is empty or the model is not recognized.
pub async fn complete_chat<G: Gateway + ?Sized>(
    gateway: &G,
    mut chat: Chat,
    selection: Selection,
) -> BatchResult<Chat> {
    let start = Instant::now();
    if chat.prompt().is_empty() {
        return Err(BatchError::MissingPrompt);
    }
    if chat.id.is_empty() {
        chat.id = new_chat_id();
        chat.request.user = Some(chat.id.clone());
    }
    if chat.request.model.is_empty() {
        chat.request.model = FALLBACK_MODEL.to_string();
    }
    if !gateway.is_valid_model(&chat.request.model).await {
        return Err(BatchError::UnknownModel(chat.request.model.clone()));
    }
    let result = gateway.complete_chat(&chat.request).await;
    chat.resolve(result, selection, start.elapsed());
    Ok(chat)
}
