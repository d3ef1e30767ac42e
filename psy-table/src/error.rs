//! Error types for table operations

use std::io;
use thiserror::Error;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Errors that can occur while reading, querying or writing tables
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TableError {
    /// File could not be opened, read or written
    #[error("{path}: {source}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Malformed delimited text
    #[error("{path}: {source}")]
    Csv {
        /// File path
        path: String,
        /// Underlying error
        #[source]
        source: csv::Error,
    },

    /// Two header columns share a name
    #[error("{path}: duplicate column name {name}")]
    DuplicateColumn {
        /// File path
        path: String,
        /// Repeated column name
        name: String,
    },

    /// The file has no header or no data rows
    #[error("{path}: no records found")]
    Empty {
        /// File path
        path: String,
    },

    /// A required column is absent
    #[error("{path}: column {name} not found")]
    MissingColumn {
        /// File path
        path: String,
        /// Column name
        name: String,
    },

    /// No row matches a `name=value` ID
    #[error("{path}: ID {id} not found")]
    MissingRow {
        /// File path
        path: String,
        /// Row ID
        id: String,
    },

    /// The requested field is blank for the selected row
    #[error("{path}: field {field} for {id} is empty")]
    EmptyField {
        /// File path
        path: String,
        /// Field name
        field: String,
        /// Row ID, or "random"
        id: String,
    },

    /// A row ID that is not a `name=value` pair
    #[error("ID {0} is not a name=value pair")]
    InvalidId(String),

    /// A required argument was empty
    #[error("{0} is required")]
    MissingParameter(&'static str),
}

impl TableError {
    /// Wrap an I/O error with its path
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a CSV error with its path
    pub fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Create a missing column error
    pub fn missing_column(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingColumn {
            path: path.into(),
            name: name.into(),
        }
    }
}

impl From<TableError> for psy_core::Error {
    fn from(err: TableError) -> Self {
        match err {
            TableError::Io { path, source } => psy_core::Error::io(path, source),
            other => psy_core::Error::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TableError::DuplicateColumn {
            path: "answers.csv".into(),
            name: "id".into(),
        };
        assert_eq!(err.to_string(), "answers.csv: duplicate column name id");

        let err = TableError::missing_column("questions.csv", "questionID");
        assert_eq!(err.to_string(), "questions.csv: column questionID not found");

        let err = TableError::InvalidId("id".into());
        assert_eq!(err.to_string(), "ID id is not a name=value pair");

        let err = TableError::MissingParameter("field name");
        assert_eq!(err.to_string(), "field name is required");
    }

    #[test]
    fn test_into_core_error() {
        let err: psy_core::Error = TableError::Empty {
            path: "empty.csv".into(),
        }
        .into();
        assert!(matches!(err, psy_core::Error::Validation(_)));

        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: psy_core::Error = TableError::io("missing.csv", io_err).into();
        assert_eq!(err.to_string(), "I/O error: missing.csv: gone");
    }
}
