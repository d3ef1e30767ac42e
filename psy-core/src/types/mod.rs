//! Wire types exchanged with the provider API

pub mod batch;
pub mod chat;
pub mod file;
pub mod fine_tune;
pub mod message;
pub mod model;

use serde::{Deserialize, Serialize};

/// A page of objects returned by a list endpoint
///
/// The provider wraps every collection in the same envelope; cursor fields are
/// only populated by the paginated endpoints (batches, fine-tuning jobs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Object type, "list" is expected
    #[serde(default)]
    pub object: String,
    /// Items in this page
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// First ID in this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    /// Last ID in this page, used as the `after` cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    /// Whether more items are available after this page
    #[serde(default)]
    pub has_more: bool,
}

/// Acknowledgement returned by delete endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    /// ID of the deleted object
    pub id: String,
    /// Object type, e.g. "file"
    #[serde(default)]
    pub object: String,
    /// Whether the object was deleted
    #[serde(default)]
    pub deleted: bool,
}

/// Deserialize a `null` field as the type's default value
///
/// The provider sends explicit `null` for empty maps and counters on objects
/// that have not progressed far enough to populate them.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
