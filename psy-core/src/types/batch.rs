//! Provider-managed batch jobs and their line-delimited payloads

use crate::types::chat::{ChatRequest, ChatResponse};
use crate::types::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Endpoint path used for batched chat completions
pub const CHAT_COMPLETIONS_ENDPOINT: &str = "/v1/chat/completions";

/// Completion window requested for every batch job
pub const COMPLETION_WINDOW: &str = "24h";

/// Lifecycle status of a batch job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Input file is being validated
    Validating,
    /// Requests are being processed
    InProgress,
    /// Results are being prepared
    Finalizing,
    /// Results are available
    Completed,
    /// Validation or processing failed
    Failed,
    /// The completion window elapsed
    Expired,
    /// Cancellation requested
    Cancelling,
    /// Cancellation finished
    Cancelled,
    /// A status this client does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl BatchStatus {
    /// Whether the status is terminal
    pub fn is_done(self) -> bool {
        matches!(
            self,
            BatchStatus::Completed
                | BatchStatus::Failed
                | BatchStatus::Expired
                | BatchStatus::Cancelled
        )
    }

    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Validating => "validating",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Finalizing => "finalizing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Expired => "expired",
            BatchStatus::Cancelling => "cancelling",
            BatchStatus::Cancelled => "cancelled",
            BatchStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request counts reported for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    /// Total requests in the batch
    #[serde(default)]
    pub total: u64,
    /// Requests that completed
    #[serde(default)]
    pub completed: u64,
    /// Requests that failed
    #[serde(default)]
    pub failed: u64,
}

/// An error reported for a batch or one of its items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchErrorDetail {
    /// Error code identifying the error type
    #[serde(default)]
    pub code: String,
    /// Human-readable description
    #[serde(default)]
    pub message: String,
    /// Parameter that caused the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Input file line that caused the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

impl BatchErrorDetail {
    /// Whether any field is populated
    pub fn has_error(&self) -> bool {
        !self.code.is_empty()
            || !self.message.is_empty()
            || self.param.as_deref().is_some_and(|p| !p.is_empty())
            || self.line.is_some_and(|l| l > 0)
    }
}

impl fmt::Display for BatchErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}", self.code)?;
        if let Some(param) = self.param.as_deref().filter(|p| !p.is_empty()) {
            write!(f, " param {param}")?;
        }
        if let Some(line) = self.line.filter(|l| *l > 0) {
            write!(f, " line {line}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Errors attached to a batch job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchErrorList {
    /// Object type, "list" is expected
    #[serde(default)]
    pub object: String,
    /// The errors
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<BatchErrorDetail>,
}

/// A provider-managed batch job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Batch ID, e.g. "batch_XjGxS3KTG0uNmNOK362iJua3"
    pub id: String,
    /// Object type, e.g. "batch"
    #[serde(default)]
    pub object: String,
    /// Endpoint the batched requests target
    #[serde(default)]
    pub endpoint: String,
    /// ID of the line-delimited input file
    #[serde(default)]
    pub input_file_id: String,
    /// Requested completion window, e.g. "24h"
    #[serde(default)]
    pub completion_window: String,
    /// Current status
    #[serde(default)]
    pub status: BatchStatus,
    /// ID of the output file, once results exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_id: Option<String>,
    /// ID of the error file, once errors exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_file_id: Option<String>,
    /// Caller-supplied key/value pairs
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: BTreeMap<String, String>,
    /// Request counts
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_counts: RequestCounts,
    /// Batch-level errors
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: BatchErrorList,
    /// Creation time in epoch seconds
    #[serde(default)]
    pub created_at: i64,
    /// Processing start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_at: Option<i64>,
    /// Expiry time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Finalizing start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalizing_at: Option<i64>,
    /// Completion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    /// Failure time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<i64>,
    /// Expiration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<i64>,
    /// Cancellation request time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelling_at: Option<i64>,
    /// Cancellation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
}

impl Batch {
    /// Whether the batch reached a terminal status
    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    /// Metadata value for `key`, if present and non-empty
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Time elapsed since creation, up to the latest terminal timestamp
    ///
    /// A batch that is still running is measured against the current time.
    pub fn duration(&self) -> Duration {
        if self.created_at == 0 {
            return Duration::ZERO;
        }
        let end = [
            self.completed_at,
            self.failed_at,
            self.expired_at,
            self.cancelled_at,
        ]
        .into_iter()
        .flatten()
        .max()
        .filter(|t| *t > 0)
        .unwrap_or_else(|| chrono::Utc::now().timestamp());
        Duration::from_secs(u64::try_from(end - self.created_at).unwrap_or(0))
    }

    /// One-line progress summary
    pub fn progress(&self) -> String {
        format!(
            "{} {}, {} total, {} completed, {} failed, {} elapsed",
            self.id,
            self.status,
            self.request_counts.total,
            self.request_counts.completed,
            self.request_counts.failed,
            format_elapsed(self.duration())
        )
    }
}

/// Format a duration the way progress lines report it, e.g. "1h2m3s"
pub fn format_elapsed(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    if secs < 60 {
        return format!("{:.1}s", duration.as_secs_f64());
    }
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else {
        format!("{minutes}m{seconds}s")
    }
}

/// Body of a create-batch call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    /// ID of an uploaded file with purpose "batch"
    pub input_file_id: String,
    /// Endpoint the batched requests target
    pub endpoint: String,
    /// Completion window, e.g. "24h"
    pub completion_window: String,
    /// Up to 16 key/value pairs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl CreateBatchRequest {
    /// A chat-completions batch over an uploaded input file
    pub fn chat(input_file_id: impl Into<String>, metadata: BTreeMap<String, String>) -> Self {
        Self {
            input_file_id: input_file_id.into(),
            endpoint: CHAT_COMPLETIONS_ENDPOINT.to_string(),
            completion_window: COMPLETION_WINDOW.to_string(),
            metadata,
        }
    }
}

/// One line of a batch input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestItem {
    /// Correlation id used to match outputs to inputs
    pub custom_id: String,
    /// HTTP method, "POST"
    pub method: String,
    /// Relative URL, e.g. "/v1/chat/completions"
    pub url: String,
    /// Request body
    pub body: ChatRequest,
}

impl BatchRequestItem {
    /// A chat completion line
    pub fn chat(custom_id: impl Into<String>, body: ChatRequest) -> Self {
        Self {
            custom_id: custom_id.into(),
            method: "POST".to_string(),
            url: CHAT_COMPLETIONS_ENDPOINT.to_string(),
            body,
        }
    }
}

/// HTTP response recorded for one batch item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResponse {
    /// HTTP status code
    #[serde(default)]
    pub status_code: u16,
    /// Provider request ID
    #[serde(default)]
    pub request_id: String,
    /// Response body: a chat completion, or an error envelope
    #[serde(default)]
    pub body: Value,
}

/// One line of a batch output or error file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponseItem {
    /// Provider item ID, e.g. "batch_req_123"
    #[serde(default)]
    pub id: String,
    /// Correlation id from the request line
    pub custom_id: String,
    /// Recorded HTTP response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<BatchItemResponse>,
    /// Item-level error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchErrorDetail>,
}

impl BatchResponseItem {
    /// Whether the item failed
    pub fn has_error(&self) -> bool {
        self.error.as_ref().is_some_and(BatchErrorDetail::has_error)
            || self.response.as_ref().is_some_and(|r| r.status_code >= 400)
    }

    /// Human-readable error text, if the item failed
    pub fn error_message(&self) -> Option<String> {
        if let Some(detail) = self.error.as_ref().filter(|e| e.has_error()) {
            return Some(detail.to_string());
        }
        let response = self.response.as_ref().filter(|r| r.status_code >= 400)?;
        let message = response.body["error"]["message"]
            .as_str()
            .unwrap_or("request failed");
        Some(format!("status code {}: {message}", response.status_code))
    }

    /// The parsed chat completion, if the body holds one
    pub fn chat_response(&self) -> Option<ChatResponse> {
        let response = self.response.as_ref()?;
        serde_json::from_value(response.body.clone()).ok()
    }

    /// First message content of the completion, or empty
    pub fn completion(&self) -> String {
        self.chat_response()
            .and_then(|r| r.choices.into_iter().next())
            .map(|c| c.message.content)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_done() {
        let done = [
            BatchStatus::Completed,
            BatchStatus::Failed,
            BatchStatus::Expired,
            BatchStatus::Cancelled,
        ];
        let running = [
            BatchStatus::Validating,
            BatchStatus::InProgress,
            BatchStatus::Finalizing,
            BatchStatus::Cancelling,
            BatchStatus::Unknown,
        ];
        for status in done {
            assert!(status.is_done(), "{status} should be done");
        }
        for status in running {
            assert!(!status.is_done(), "{status} should not be done");
        }
    }

    #[test]
    fn test_batch_deserialization_with_nulls() {
        let batch: Batch = serde_json::from_value(serde_json::json!({
            "id": "batch_abc",
            "object": "batch",
            "endpoint": "/v1/chat/completions",
            "input_file_id": "file-in",
            "completion_window": "24h",
            "status": "in_progress",
            "output_file_id": null,
            "error_file_id": null,
            "metadata": null,
            "request_counts": {"total": 3, "completed": 1, "failed": 0},
            "errors": null,
            "created_at": 1_714_508_499,
            "completed_at": null
        }))
        .unwrap();
        assert_eq!(batch.status, BatchStatus::InProgress);
        assert!(batch.metadata.is_empty());
        assert_eq!(batch.request_counts.total, 3);
        assert!(!batch.is_done());
    }

    #[test]
    fn test_unknown_status() {
        let batch: Batch =
            serde_json::from_value(serde_json::json!({"id": "b", "status": "paused"})).unwrap();
        assert_eq!(batch.status, BatchStatus::Unknown);
    }

    #[test]
    fn test_duration_and_progress() {
        let batch = Batch {
            id: "batch_1".into(),
            status: BatchStatus::Completed,
            created_at: 1000,
            completed_at: Some(1090),
            failed_at: Some(1010),
            request_counts: RequestCounts {
                total: 4,
                completed: 3,
                failed: 1,
            },
            ..Default::default()
        };
        assert_eq!(batch.duration(), Duration::from_secs(90));
        assert_eq!(
            batch.progress(),
            "batch_1 completed, 4 total, 3 completed, 1 failed, 1m30s elapsed"
        );
        assert_eq!(Batch::default().duration(), Duration::ZERO);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "1h2m3s");
    }

    #[test]
    fn test_error_detail_display() {
        let detail = BatchErrorDetail {
            code: "invalid_json".into(),
            message: "bad line".into(),
            param: Some("body".into()),
            line: Some(3),
        };
        assert_eq!(
            detail.to_string(),
            "error invalid_json param body line 3: bad line"
        );
        assert!(!BatchErrorDetail::default().has_error());
    }

    #[test]
    fn test_response_item_completion() {
        let item: BatchResponseItem = serde_json::from_value(serde_json::json!({
            "id": "batch_req_1",
            "custom_id": "c1",
            "response": {
                "status_code": 200,
                "request_id": "req_1",
                "body": {"model": "gpt-4o", "choices": [{"index": 0, "message": {"role": "assistant", "content": "I give it 8"}}]}
            },
            "error": null
        }))
        .unwrap();
        assert!(!item.has_error());
        assert_eq!(item.completion(), "I give it 8");
        assert_eq!(item.error_message(), None);
    }

    #[test]
    fn test_response_item_errors() {
        let item: BatchResponseItem = serde_json::from_value(serde_json::json!({
            "id": "batch_req_2",
            "custom_id": "c2",
            "response": null,
            "error": {"code": "server_error", "message": "boom"}
        }))
        .unwrap();
        assert!(item.has_error());
        assert_eq!(item.error_message().unwrap(), "error server_error: boom");
        assert_eq!(item.completion(), "");

        let item: BatchResponseItem = serde_json::from_value(serde_json::json!({
            "custom_id": "c3",
            "response": {"status_code": 400, "request_id": "r", "body": {"error": {"message": "context too long"}}}
        }))
        .unwrap();
        assert!(item.has_error());
        assert_eq!(
            item.error_message().unwrap(),
            "status code 400: context too long"
        );
    }
}
