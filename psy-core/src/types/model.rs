//! Model metadata

use serde::{Deserialize, Serialize};

/// Model IDs accepted without a remote lookup
pub const COMMON_MODELS: &[&str] = &[
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4-turbo-preview",
    "gpt-4o",
    "gpt-4o-mini",
];

/// A model available to the organization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model ID, e.g. "gpt-4"
    pub id: String,
    /// Object type, e.g. "model"
    #[serde(default)]
    pub object: String,
    /// Creation time in epoch seconds
    #[serde(default)]
    pub created: i64,
    /// Owner, e.g. "openai"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owned_by: String,
}
