//! Asynchronous batch jobs: submission, polling and reconciliation

use crate::builder::CHAT_ID_FIELD;
use crate::chat::Chat;
use crate::error::{BatchError, BatchResult};
use crate::merge::{merge_outcomes, MergeSummary, Outcome};
use crate::params::ChatParameters;
use crate::score::{select_scores, Selection};
use psy_core::{Batch, BatchRequestItem, BatchResponseItem, CreateBatchRequest, Gateway, BATCH_PURPOSE};
use psy_table::Table;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Encode chats as a line-delimited batch input payload
///
/// Each line is a POST to the chat completions endpoint with the chat ID as
/// its custom ID.
///
/// # Errors
///
/// Fails only if a request cannot be serialized.
pub fn encode_requests(chats: &[Chat]) -> BatchResult<Vec<u8>> {
    let mut payload = Vec::new();
    for chat in chats {
        let item = BatchRequestItem::chat(chat.id.clone(), chat.request.clone());
        serde_json::to_writer(&mut payload, &item)?;
        payload.push(b'\n');
    }
    Ok(payload)
}

/// What [`submit_batch`] did
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The payload was written locally and nothing was uploaded
    InputOnly {
        /// Payload path
        path: String,
        /// Requests in the payload
        requests: usize,
    },
    /// The payload was uploaded and a batch job created
    Submitted {
        /// ID of the uploaded input file
        file_id: String,
        /// The new batch job
        batch: Batch,
    },
}

/// Submit chats as a provider batch job
///
/// The chat-ID-tagged table is written to the output file before anything
/// is uploaded, so a later [`process_batch_results`] call can finish the run
/// from the batch metadata alone. With `input_only`, the payload is written
/// to [`ChatParameters::input_path`] instead and nothing else happens.
///
/// # Errors
///
/// Fails if a file cannot be written, or if the upload or batch creation
/// is rejected.
pub async fn submit_batch<G: Gateway + ?Sized>(
    gateway: &G,
    chats: &[Chat],
    table: &Table,
    params: &ChatParameters,
    input_only: bool,
) -> BatchResult<Submission> {
    let payload = encode_requests(chats)?;
    if input_only {
        let path = params.input_path();
        std::fs::write(&path, &payload).map_err(|e| BatchError::io(&path, e))?;
        info!(path = %path, requests = chats.len(), "batch input written");
        return Ok(Submission::InputOnly {
            path,
            requests: chats.len(),
        });
    }

    table.write(&params.output_file)?;
    debug!(output = %params.output_file, "pending results written");

    let file = gateway
        .upload_file(&params.input_name(), BATCH_PURPOSE, payload)
        .await?;
    let request = CreateBatchRequest::chat(file.id.clone(), params.metadata());
    let batch = gateway.create_batch(&request).await?;
    info!(batch_id = %batch.id, file_id = %file.id, status = %batch.status, requests = chats.len(), "batch submitted");
    Ok(Submission::Submitted {
        file_id: file.id,
        batch,
    })
}

/// Poll a batch until it reaches a terminal status
///
/// `on_poll` sees the batch after every read, including the last.
///
/// # Errors
///
/// Fails if a read fails.
pub async fn poll_batch<G, F>(
    gateway: &G,
    batch_id: &str,
    interval: Duration,
    mut on_poll: F,
) -> BatchResult<Batch>
where
    G: Gateway + ?Sized,
    F: FnMut(&Batch),
{
    loop {
        let batch = gateway.read_batch(batch_id).await?;
        debug!(batch_id, status = %batch.status, "batch polled");
        on_poll(&batch);
        if batch.is_done() {
            return Ok(batch);
        }
        tokio::time::sleep(interval).await;
    }
}

/// Parse a line-delimited batch output or error file
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`BatchError::JsonLine`] with the 1-based number of the first
/// malformed line.
pub fn parse_response_lines(content: &[u8], source_name: &str) -> BatchResult<Vec<BatchResponseItem>> {
    content
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .map(|(i, line)| {
            serde_json::from_slice(line).map_err(|source| BatchError::JsonLine {
                source_name: source_name.to_string(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Download a batch's output and error files, keyed by custom ID
///
/// The output file is read first; an ID that also appears in the error file
/// takes the error file's entry.
///
/// # Errors
///
/// Returns [`BatchError::NoResults`] when the batch has neither file yet.
pub async fn read_batch_responses<G: Gateway + ?Sized>(
    gateway: &G,
    batch: &Batch,
) -> BatchResult<HashMap<String, BatchResponseItem>> {
    let files: Vec<&str> = [&batch.output_file_id, &batch.error_file_id]
        .into_iter()
        .filter_map(|id| id.as_deref().filter(|id| !id.is_empty()))
        .collect();
    if files.is_empty() {
        return Err(BatchError::NoResults {
            id: batch.id.clone(),
            status: batch.status.to_string(),
        });
    }

    let mut responses = HashMap::new();
    for file_id in files {
        let content = gateway.download_file(file_id).await?;
        for item in parse_response_lines(&content, file_id)? {
            responses.insert(item.custom_id.clone(), item);
        }
    }
    debug!(batch_id = %batch.id, responses = responses.len(), "batch responses read");
    Ok(responses)
}

/// Write batch responses onto the rows whose `chatID` they belong to
///
/// Failed items contribute their error text and no scores. Rows with no
/// response are left as they are.
pub fn reconcile(
    table: &mut Table,
    responses: &HashMap<String, BatchResponseItem>,
    score_field: &str,
    selection: Selection,
) -> MergeSummary {
    let outcomes: HashMap<String, Outcome> = responses
        .iter()
        .map(|(id, item)| {
            let outcome = match item.error_message() {
                Some(error) => Outcome::failure(error),
                None => {
                    let completion = item.completion();
                    let scores = select_scores(&completion, selection);
                    Outcome::success(completion, scores)
                }
            };
            (id.clone(), outcome)
        })
        .collect();

    let summary = merge_outcomes(table, &outcomes, score_field);
    let pending = table
        .rows()
        .iter()
        .filter(|row| {
            let id = row.get(CHAT_ID_FIELD);
            !id.is_empty() && !responses.contains_key(id)
        })
        .count();
    if pending > 0 {
        warn!(pending, "rows without a batch response left unchanged");
    }
    summary
}

/// A finished reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResults {
    /// The batch as last read
    pub batch: Batch,
    /// Path the completed table was written to
    pub output_file: String,
    /// Merge counts
    pub summary: MergeSummary,
}

/// Finish a batch run given only its ID
///
/// Everything else comes from the batch metadata: the output file written
/// at submission, the score field and the selection policy.
///
/// # Errors
///
/// Fails if the batch cannot be read, has no results yet, lacks an output
/// file in its metadata, or if the output file cannot be read or rewritten.
pub async fn process_batch_results<G: Gateway + ?Sized>(
    gateway: &G,
    batch_id: &str,
) -> BatchResult<BatchResults> {
    let batch = gateway.read_batch(batch_id).await?;
    let responses = read_batch_responses(gateway, &batch).await?;
    let params = ChatParameters::from_metadata(&batch.id, &batch.metadata)?;

    let mut table = Table::load(&params.output_file)?;
    let summary = reconcile(
        &mut table,
        &responses,
        &params.score_field,
        params.score_select,
    );
    table.write(&params.output_file)?;
    info!(batch_id = %batch.id, rows = summary.rows, errors = summary.errors, output = %params.output_file, "batch results written");
    Ok(BatchResults {
        batch,
        output_file: params.output_file,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::new_chat_id;
    use crate::params::keys;
    use crate::testing::MockGateway;
    use pretty_assertions::assert_eq;
    use psy_core::BatchStatus;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn success_line(id: &str, text: &str) -> String {
        json!({
            "id": format!("batch_req_{id}"),
            "custom_id": id,
            "response": {
                "status_code": 200,
                "request_id": "req_1",
                "body": {
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "model": "gpt-4o",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
                    "usage": {"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8}
                }
            },
            "error": null
        })
        .to_string()
    }

    fn error_line(id: &str) -> String {
        json!({
            "id": format!("batch_req_{id}"),
            "custom_id": id,
            "response": {
                "status_code": 400,
                "request_id": "req_2",
                "body": {"error": {"message": "Invalid model", "type": "invalid_request_error"}}
            },
            "error": null
        })
        .to_string()
    }

    #[test]
    fn test_encode_requests() {
        let chats = vec![
            Chat::new("a", "", "one", "gpt-4o", 0.5, 0),
            Chat::new("b", "", "two", "gpt-4o", 0.5, 0),
        ];
        let payload = String::from_utf8(encode_requests(&chats).unwrap()).unwrap();
        let lines: Vec<_> = payload.lines().collect();
        assert_eq!(lines.len(), 2);
        let item: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(item["custom_id"], "b");
        assert_eq!(item["method"], "POST");
        assert_eq!(item["url"], "/v1/chat/completions");
        assert_eq!(item["body"]["user"], "b");
    }

    #[test]
    fn test_parse_response_lines_reports_line_number() {
        let content = format!("{}\n\n{}\nnot json\n", success_line("a", "1"), error_line("b"));
        let err = parse_response_lines(content.as_bytes(), "file-out").unwrap_err();
        match err {
            BatchError::JsonLine { source_name, line, .. } => {
                assert_eq!(source_name, "file-out");
                assert_eq!(line, 4);
            }
            other => panic!("unexpected error: {other}"),
        }

        let content = format!("{}\n\n{}\n", success_line("a", "1"), error_line("b"));
        let items = parse_response_lines(content.as_bytes(), "file-out").unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[1].has_error());
    }

    #[test]
    fn test_reconcile_two_successes_one_error() {
        let mut table = Table::from_reader(
            "name,answer,chatID\nann,yes,c1\nbob,no,c2\ncal,maybe,c3\ndee,,\n".as_bytes(),
            "results.csv",
        )
        .unwrap();
        let content = [
            success_line("c1", "I rate this 3 out of 5"),
            success_line("c2", "Score: 4"),
            error_line("c3"),
        ]
        .join("\n");
        let responses: HashMap<_, _> = parse_response_lines(content.as_bytes(), "out")
            .unwrap()
            .into_iter()
            .map(|item| (item.custom_id.clone(), item))
            .collect();

        let summary = reconcile(&mut table, &responses, "score", Selection::All);

        assert_eq!(summary, MergeSummary { rows: 3, errors: 1, max_scores: 2 });
        assert_eq!(
            table.columns(),
            ["name", "answer", "chatID", "completion", "score1", "score2"]
        );
        let rows = table.rows();
        assert_eq!(rows[0].get("completion"), "I rate this 3 out of 5");
        assert_eq!(rows[0].get("score1"), "3.000000");
        assert_eq!(rows[0].get("score2"), "5.000000");
        assert_eq!(rows[1].get("score1"), "4.000000");
        assert_eq!(rows[1].get("score2"), "");
        assert_eq!(rows[2].get("completion"), "status code 400: Invalid model");
        assert_eq!(rows[2].get("score1"), "");
        assert_eq!(rows[3].get("completion"), "");
    }

    #[tokio::test]
    async fn test_read_batch_responses_requires_a_file() {
        let gateway = MockGateway::new();
        let batch = Batch {
            id: "batch_1".into(),
            status: BatchStatus::InProgress,
            ..Default::default()
        };
        let err = read_batch_responses(&gateway, &batch).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "batch batch_1 (in_progress) has no output or error file yet"
        );
    }

    #[tokio::test]
    async fn test_error_file_entries_win() {
        let gateway = MockGateway::new()
            .with_file("file-out", success_line("c1", "5"))
            .with_file("file-err", error_line("c1"));
        let batch = Batch {
            id: "batch_1".into(),
            status: BatchStatus::Completed,
            output_file_id: Some("file-out".into()),
            error_file_id: Some("file-err".into()),
            ..Default::default()
        };
        let responses = read_batch_responses(&gateway, &batch).await.unwrap();
        assert_eq!(responses.len(), 1);
        assert!(responses["c1"].has_error());
    }

    #[tokio::test]
    async fn test_input_only_writes_payload() {
        let dir = TempDir::new().unwrap();
        let answers = dir.path().join("answers.csv");
        let params = ChatParameters {
            answer_file: answers.to_str().unwrap().to_string(),
            output_file: dir.path().join("out.csv").to_str().unwrap().to_string(),
            ..Default::default()
        };
        let table = Table::new(["answer", "chatID"]);
        let chats = vec![Chat::new(new_chat_id(), "", "p", "gpt-4o", 0.5, 0)];
        let gateway = MockGateway::new();

        let submission = submit_batch(&gateway, &chats, &table, &params, true)
            .await
            .unwrap();

        let expected = dir.path().join("answers.jsonl");
        assert_eq!(
            submission,
            Submission::InputOnly {
                path: expected.to_str().unwrap().to_string(),
                requests: 1
            }
        );
        assert_eq!(std::fs::read(&expected).unwrap(), encode_requests(&chats).unwrap());
        assert!(!dir.path().join("out.csv").exists());
        assert!(gateway.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_submit_then_process_results() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("results.csv").to_str().unwrap().to_string();
        let mut table = Table::from_reader("answer\nyes\nno\n".as_bytes(), "answers.csv").unwrap();
        table.add_column(CHAT_ID_FIELD);
        let chats: Vec<_> = table
            .rows_mut()
            .iter_mut()
            .map(|row| {
                let chat = Chat::new(new_chat_id(), "", row.get("answer"), "gpt-4o", 0.5, 0);
                row.set(CHAT_ID_FIELD, chat.id.as_str());
                chat
            })
            .collect();
        let params = ChatParameters {
            answer_file: dir.path().join("answers.csv").to_str().unwrap().to_string(),
            output_file: output.clone(),
            score_select: Selection::First,
            ..Default::default()
        };
        let gateway = MockGateway::new();

        let Submission::Submitted { batch, .. } =
            submit_batch(&gateway, &chats, &table, &params, false).await.unwrap()
        else {
            panic!("expected a submitted batch");
        };

        // The pending table exists before results do
        let pending = Table::load(&output).unwrap();
        assert_eq!(pending.columns(), ["answer", "chatID"]);
        let uploads = gateway.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "answers.jsonl");
        assert_eq!(batch.meta(keys::OUTPUT_FILE), Some(output.as_str()));
        assert_eq!(batch.meta(keys::SCORE_SELECT), Some("first"));

        let content = format!(
            "{}\n{}\n",
            success_line(&chats[0].id, "2 then 9"),
            error_line(&chats[1].id)
        );
        gateway.finish_batch(&batch.id, "file-out", content);

        let results = process_batch_results(&gateway, &batch.id).await.unwrap();
        assert_eq!(results.summary, MergeSummary { rows: 2, errors: 1, max_scores: 1 });
        assert_eq!(results.output_file, output);

        let written = Table::load(&output).unwrap();
        assert_eq!(written.columns(), ["answer", "chatID", "completion", "score"]);
        assert_eq!(written.rows()[0].get("score"), "2.000000");
        assert_eq!(written.rows()[1].get("completion"), "status code 400: Invalid model");
    }

    #[tokio::test]
    async fn test_process_results_needs_output_file() {
        let gateway = MockGateway::new()
            .with_file("file-out", success_line("c1", "5"))
            .with_batch(Batch {
                id: "batch_9".into(),
                status: BatchStatus::Completed,
                output_file_id: Some("file-out".into()),
                metadata: BTreeMap::new(),
                ..Default::default()
            });
        assert!(matches!(
            process_batch_results(&gateway, "batch_9").await,
            Err(BatchError::MissingMetadata { key: "output_file", .. })
        ));
    }

    #[tokio::test]
    async fn test_poll_until_done() {
        let gateway = MockGateway::new().with_batch(Batch {
            id: "batch_2".into(),
            status: BatchStatus::Finalizing,
            ..Default::default()
        });
        gateway.advance_on_read("batch_2", BatchStatus::Completed);
        let mut seen = Vec::new();
        let batch = poll_batch(&gateway, "batch_2", Duration::from_millis(1), |b| {
            seen.push(b.status);
        })
        .await
        .unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(seen, vec![BatchStatus::Finalizing, BatchStatus::Completed]);
    }
}
