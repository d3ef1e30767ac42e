//! Error types for the completion pipeline

use psy_table::TableError;
use std::io;
use thiserror::Error;

/// Result type for pipeline operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors that abort a pipeline operation
///
/// Failures of individual completions are not errors at this level; they are
/// recorded on the affected [`Chat`](crate::Chat) instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BatchError {
    /// Score selection outside first, last, all, none
    #[error("invalid score selection (expect first, last, all, or none): {0}")]
    InvalidSelection(String),

    /// The gateway does not recognize the model
    #[error("model {0} is not a recognized model ID")]
    UnknownModel(String),

    /// A chat needs a non-empty prompt
    #[error("prompt is required")]
    MissingPrompt,

    /// The prompt template has nowhere to put the answer
    #[error("prompt template {0} has no answer marker")]
    MissingAnswerMarker(String),

    /// The answer column is absent from the answer table
    #[error("answer field {field} not found in {path}")]
    MissingAnswerField {
        /// Column name
        field: String,
        /// Answer file
        path: String,
    },

    /// The question lookup column is absent from the answer table
    #[error("question ID field {field} not found in {path}")]
    MissingQuestionKey {
        /// Column name
        field: String,
        /// Answer file
        path: String,
    },

    /// Answer rows whose question key has no question
    #[error("unknown question IDs in answer file {path}: {}", .ids.join(", "))]
    UnknownQuestions {
        /// Answer file
        path: String,
        /// Unresolved keys, in row order
        ids: Vec<String>,
    },

    /// An answer ID that is neither "random" nor a `name=value` pair
    #[error("answer ID {0} is not a name=value pair")]
    InvalidRowId(String),

    /// The answer ID column is absent from the answer table
    #[error("answer ID field {field} not found in file {path}")]
    MissingRowField {
        /// Column name
        field: String,
        /// Answer file
        path: String,
    },

    /// No answer row matches the answer ID
    #[error("answer {id} not found in file {path}")]
    RowNotFound {
        /// Answer ID
        id: String,
        /// Answer file
        path: String,
    },

    /// Random selection from a table without rows
    #[error("no records found in file {0}")]
    EmptyTable(String),

    /// Batch metadata lacks a required key
    #[error("{key} not found in batch {batch_id} metadata")]
    MissingMetadata {
        /// Metadata key
        key: &'static str,
        /// Batch ID
        batch_id: String,
    },

    /// The batch has produced neither an output nor an error file
    #[error("batch {id} ({status}) has no output or error file yet")]
    NoResults {
        /// Batch ID
        id: String,
        /// Batch status
        status: String,
    },

    /// A malformed line in a line-delimited JSON file
    #[error("{source_name} line {line}: {source}")]
    JsonLine {
        /// File name or ID
        source_name: String,
        /// 1-based line number
        line: usize,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Request encoding failure
    #[error("encode batch request: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Table load, lookup or write failure
    #[error(transparent)]
    Table(#[from] TableError),

    /// Remote API failure
    #[error(transparent)]
    Gateway(#[from] psy_core::Error),

    /// Local file failure
    #[error("{path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl BatchError {
    /// Wrap an I/O error with its path
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BatchError::UnknownQuestions {
            path: "answers.csv".into(),
            ids: vec!["q7".into(), "q9".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown question IDs in answer file answers.csv: q7, q9"
        );

        let err = BatchError::InvalidSelection("most".into());
        assert_eq!(
            err.to_string(),
            "invalid score selection (expect first, last, all, or none): most"
        );

        let err = BatchError::MissingMetadata {
            key: "output_file",
            batch_id: "batch_1".into(),
        };
        assert_eq!(err.to_string(), "output_file not found in batch batch_1 metadata");
    }

    #[test]
    fn test_json_line_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = BatchError::JsonLine {
            source_name: "file-out".into(),
            line: 3,
            source,
        };
        assert!(err.to_string().starts_with("file-out line 3: "));
    }

    #[test]
    fn test_gateway_error_is_transparent() {
        let err: BatchError = psy_core::Error::validation("chat: no choices found").into();
        assert_eq!(err.to_string(), "Validation error: chat: no choices found");
    }
}
