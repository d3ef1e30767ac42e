//! Uploaded file metadata

use serde::{Deserialize, Serialize};

/// Purpose tag for batch input files
pub const BATCH_PURPOSE: &str = "batch";

/// Purpose tag for fine-tuning data, the upload default
pub const FINE_TUNE_PURPOSE: &str = "fine-tune";

/// Metadata for a file stored with the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// File ID, e.g. "file-abc123"
    pub id: String,
    /// Object type, e.g. "file"
    #[serde(default)]
    pub object: String,
    /// Size in bytes
    #[serde(default)]
    pub bytes: u64,
    /// Creation time in epoch seconds
    #[serde(default)]
    pub created_at: i64,
    /// Name the file was uploaded with
    #[serde(default)]
    pub filename: String,
    /// Purpose, e.g. "batch" or "fine-tune"
    #[serde(default)]
    pub purpose: String,
}
