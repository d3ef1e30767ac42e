//! Lookups against side tables

use crate::error::{TableError, TableResult};
use crate::table::Table;
use crate::text::clean_text;
use std::collections::HashMap;

/// Split a `name=value` row ID
///
/// # Errors
///
/// Returns [`TableError::InvalidId`] unless the ID holds exactly one `=`
/// with a non-empty name before it.
pub fn parse_row_id(id: &str) -> TableResult<(&str, &str)> {
    match id.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.contains('=') => Ok((name, value)),
        _ => Err(TableError::InvalidId(id.to_string())),
    }
}

/// Read cleaned key/value pairs from two columns of a CSV file
///
/// Rows whose cleaned key or value is blank are skipped. An empty path
/// yields an empty map.
pub fn read_fields(path: &str, key_field: &str, value_field: &str) -> TableResult<HashMap<String, String>> {
    if path.is_empty() {
        return Ok(HashMap::new());
    }
    if key_field.is_empty() {
        return Err(TableError::MissingParameter("key field name"));
    }
    if value_field.is_empty() {
        return Err(TableError::MissingParameter("value field name"));
    }
    let table = Table::load(path)?;
    for field in [key_field, value_field] {
        if !table.has_column(field) {
            return Err(TableError::missing_column(path, field));
        }
    }
    Ok(table
        .rows()
        .iter()
        .map(|row| (clean_text(row.get(key_field)), clean_text(row.get(value_field))))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .collect())
}

/// Read one cleaned field from the row matching a `name=value` ID
///
/// An empty path yields an empty string.
pub fn read_field(path: &str, id: &str, field: &str) -> TableResult<String> {
    if path.is_empty() {
        return Ok(String::new());
    }
    if id.is_empty() {
        return Err(TableError::MissingParameter("row ID (name=value)"));
    }
    if field.is_empty() {
        return Err(TableError::MissingParameter("field name"));
    }
    let table = Table::load(path)?;
    let (name, value) = parse_row_id(id)?;
    if !table.has_column(name) {
        return Err(TableError::missing_column(path, name));
    }
    let row = table
        .find_row(name, value)
        .ok_or_else(|| TableError::MissingRow {
            path: path.to_string(),
            id: id.to_string(),
        })?;
    if !table.has_column(field) {
        return Err(TableError::missing_column(path, field));
    }
    let text = clean_text(row.get(field));
    if text.is_empty() {
        return Err(TableError::EmptyField {
            path: path.to_string(),
            field: field.to_string(),
            id: id.to_string(),
        });
    }
    Ok(text)
}

/// Read one cleaned field from a uniformly selected row
pub fn random_field(path: &str, field: &str) -> TableResult<String> {
    if path.is_empty() {
        return Err(TableError::MissingParameter("file path"));
    }
    if field.is_empty() {
        return Err(TableError::MissingParameter("field name"));
    }
    let table = Table::load(path)?;
    if !table.has_column(field) {
        return Err(TableError::missing_column(path, field));
    }
    let text = table
        .random_row()
        .map(|row| clean_text(row.get(field)))
        .unwrap_or_default();
    if text.is_empty() {
        return Err(TableError::EmptyField {
            path: path.to_string(),
            field: field.to_string(),
            id: "random".to_string(),
        });
    }
    Ok(text)
}
