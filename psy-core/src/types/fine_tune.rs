//! Fine-tuning jobs, events and training records

use crate::types::message::Message;
use crate::types::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of a training or validation file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FineTuneRecord {
    /// System, user and assistant messages of one example conversation
    pub messages: Vec<Message>,
}

/// Hyperparameters for a fine-tuning job
///
/// The provider accepts either a number or the string "auto" for each value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    /// Number of epochs to train for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_epochs: Option<Value>,
    /// Number of training examples per step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<Value>,
    /// Learning rate multiplier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate_multiplier: Option<Value>,
}

impl HyperParameters {
    fn is_empty(&self) -> bool {
        self.n_epochs.is_none()
            && self.batch_size.is_none()
            && self.learning_rate_multiplier.is_none()
    }
}

/// Body of a create-job call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FineTuneRequest {
    /// ID of an uploaded training file
    pub training_file: String,
    /// ID of an uploaded validation file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_file: Option<String>,
    /// Base model to fine-tune
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Up to 40 characters appended to the fine-tuned model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Optional hyperparameters
    #[serde(default, skip_serializing_if = "HyperParameters::is_empty")]
    pub hyperparameters: HyperParameters,
}

/// Error reported by a failed fine-tuning job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineTuneError {
    /// Machine-readable error code
    #[serde(default)]
    pub code: String,
    /// Offending parameter, e.g. "training_file"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// A fine-tuning job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FineTuneJob {
    /// Job ID, e.g. "ftjob-AF1WoRqd3aJAHsqc9NY7iL8F"
    pub id: String,
    /// Object type, e.g. "fine_tuning.job"
    #[serde(default)]
    pub object: String,
    /// Base model
    #[serde(default)]
    pub model: String,
    /// Suffix supplied at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_provided_suffix: Option<String>,
    /// Resulting model ID, once training succeeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fine_tuned_model: Option<String>,
    /// Training file ID
    #[serde(default)]
    pub training_file: String,
    /// Validation file ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_file: Option<String>,
    /// Result file IDs
    #[serde(default, deserialize_with = "null_as_default")]
    pub result_files: Vec<String>,
    /// Hyperparameters in effect
    #[serde(default, deserialize_with = "null_as_default")]
    pub hyperparameters: HyperParameters,
    /// Owning organization
    #[serde(default)]
    pub organization_id: String,
    /// Creation time in epoch seconds
    #[serde(default)]
    pub created_at: i64,
    /// Completion time in epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
    /// Billable tokens processed
    #[serde(default, deserialize_with = "null_as_default")]
    pub trained_tokens: u64,
    /// Status, e.g. "validating_files", "running", "succeeded"
    #[serde(default)]
    pub status: String,
    /// Failure details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FineTuneError>,
}

impl FineTuneJob {
    /// The fine-tuned model name, or the job ID if training has not finished
    pub fn name(&self) -> &str {
        self.fine_tuned_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.id)
    }
}

/// Training metrics attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FineTuneMetric {
    /// Training step
    #[serde(default)]
    pub step: u64,
    /// Training loss
    #[serde(default)]
    pub train_loss: f64,
    /// Validation loss
    #[serde(default)]
    pub valid_loss: f64,
    /// Mean token accuracy on training data
    #[serde(default)]
    pub train_mean_token_accuracy: f64,
    /// Mean token accuracy on validation data
    #[serde(default)]
    pub valid_mean_token_accuracy: f64,
}

/// A fine-tuning job event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FineTuneEvent {
    /// Event ID
    pub id: String,
    /// Object type, e.g. "fine_tuning.job.event"
    #[serde(default)]
    pub object: String,
    /// Creation time in epoch seconds
    #[serde(default)]
    pub created_at: i64,
    /// Level, e.g. "info"
    #[serde(default)]
    pub level: String,
    /// Message, e.g. "Job succeeded."
    #[serde(default)]
    pub message: String,
    /// Metrics, for "metrics" events
    #[serde(default, rename = "data", deserialize_with = "null_as_default")]
    pub metrics: FineTuneMetric,
    /// Event type, e.g. "message" or "metrics"
    #[serde(default, rename = "type")]
    pub kind: String,
}
