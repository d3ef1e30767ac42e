//! In-memory CSV tables with ordered columns

use crate::error::{TableError, TableResult};
use indexmap::IndexMap;
use rand::Rng;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// One table row: column name to value, in insertion order
///
/// Columns the row has no value for read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(IndexMap<String, String>);

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a column, or "" when absent
    pub fn get(&self, column: &str) -> &str {
        self.0.get(column).map_or("", String::as_str)
    }

    /// Set the value of a column
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    /// Whether the row holds a value for the column
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Iterate over column/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A two-dimensional table read from a CSV file
///
/// Column names are unique and case-sensitive; their order is the output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        let mut table = Self::default();
        for column in columns {
            table.add_column(column);
        }
        table
    }

    /// Load a table from a CSV file
    ///
    /// The header row defines the columns. Blank header names become
    /// `columnN` (1-based), as do fields beyond the last known column.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is malformed, repeats a column
    /// name, or has no data rows.
    pub fn load(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let file = File::open(path).map_err(|e| TableError::io(&source, e))?;
        let table = Self::from_reader(file, &source)?;
        debug!(
            path = %source,
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded table"
        );
        Ok(table)
    }

    /// Parse a table from CSV text; `source` names the input in errors
    pub fn from_reader<R: Read>(reader: R, source: &str) -> TableResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record.map_err(|e| TableError::csv(source, e))?,
            None => {
                return Err(TableError::Empty {
                    path: source.to_string(),
                })
            }
        };

        let mut table = Self::default();
        for (i, name) in header.iter().enumerate() {
            let name = match name.trim() {
                "" => table.synthesized_column(i),
                trimmed => trimmed.to_string(),
            };
            if table.has_column(&name) {
                return Err(TableError::DuplicateColumn {
                    path: source.to_string(),
                    name,
                });
            }
            table.columns.push(name);
        }

        for record in records {
            let record = record.map_err(|e| TableError::csv(source, e))?;
            while table.columns.len() < record.len() {
                let name = table.synthesized_column(table.columns.len());
                table.columns.push(name);
            }
            let row = table
                .columns
                .iter()
                .zip(record.iter())
                .map(|(name, value)| (name.clone(), value))
                .collect();
            table.rows.push(row);
        }

        if table.rows.is_empty() {
            return Err(TableError::Empty {
                path: source.to_string(),
            });
        }
        Ok(table)
    }

    /// Name for an unnamed column at `position`: the first free `columnN`,
    /// counting from `N = position + 1`
    fn synthesized_column(&self, position: usize) -> String {
        (position + 1..)
            .map(|n| format!("column{n}"))
            .find(|name| !self.has_column(name))
            .unwrap_or_default()
    }

    /// Write the table to a CSV file, replacing any existing content
    pub fn write(&self, path: impl AsRef<Path>) -> TableResult<()> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let file = File::create(path).map_err(|e| TableError::io(&source, e))?;
        self.to_writer(file, &source)?;
        debug!(path = %source, rows = self.row_count(), "wrote table");
        Ok(())
    }

    /// Serialize the table as CSV: header, then rows in column order
    pub fn to_writer<W: Write>(&self, writer: W, source: &str) -> TableResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(&self.columns)
            .map_err(|e| TableError::csv(source, e))?;
        for row in &self.rows {
            writer
                .write_record(self.columns.iter().map(|c| row.get(c)))
                .map_err(|e| TableError::csv(source, e))?;
        }
        writer.flush().map_err(|e| TableError::io(source, e))
    }

    /// Column names in output order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// All rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// All rows, mutably
    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append a column unless it exists already; empty names are ignored
    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !name.is_empty() && !self.has_column(&name) {
            self.columns.push(name);
        }
    }

    /// Append a row, adding any columns it introduces
    pub fn push_row(&mut self, row: Row) {
        for (column, _) in row.iter() {
            if !self.has_column(column) {
                self.columns.push(column.to_string());
            }
        }
        self.rows.push(row);
    }

    /// Index of the first row whose column equals `value`
    pub fn position(&self, column: &str, value: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.get(column) == value)
    }

    /// First row whose column equals `value`
    pub fn find_row(&self, column: &str, value: &str) -> Option<&Row> {
        self.position(column, value).map(|i| &self.rows[i])
    }

    /// Index of a uniformly selected row, or `None` for an empty table
    pub fn random_position(&self) -> Option<usize> {
        if self.rows.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..self.rows.len()))
    }

    /// A uniformly selected row, or `None` for an empty table
    pub fn random_row(&self) -> Option<&Row> {
        self.random_position().map(|i| &self.rows[i])
    }
}
