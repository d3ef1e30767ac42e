//! Error types for the psy toolkit

use std::error::Error as StdError;
use std::fmt;

/// The main error type for gateway and pipeline operations
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Transport failures: connection refused, timeouts, unreadable bodies
    Network {
        /// Error message
        message: String,
        /// Underlying error if available
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// Non-success response from the provider
    Api {
        /// HTTP status code
        status: u16,
        /// Provider error type (e.g. "invalid_request_error"), empty if unknown
        kind: String,
        /// Error message
        message: String,
    },

    /// Serialization/deserialization errors
    Serialization {
        /// Error message
        message: String,
        /// Underlying error if available
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// Invalid input detected before any request is sent
    Validation(String),

    /// Configuration errors (missing credentials, bad header values)
    Configuration(String),

    /// A referenced resource does not exist
    NotFound(String),

    /// The remote resource is not in a usable state yet
    State(String),

    /// Local file I/O errors
    Io {
        /// Error message, including the path when known
        message: String,
        /// Underlying error
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl fmt::Display, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{path}: {err}"),
            source: Some(Box::new(err)),
        }
    }

    /// HTTP status code, if this error came from a provider response
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Network { message, .. } => write!(f, "Network error: {message}"),
            Error::Api {
                status,
                kind,
                message,
            } => {
                if kind.is_empty() {
                    write!(f, "API error {status}: {message}")
                } else {
                    write!(f, "API error {status} {kind}: {message}")
                }
            }
            Error::Serialization { message, .. } => write!(f, "Serialization error: {message}"),
            Error::Validation(msg) => write!(f, "Validation error: {msg}"),
            Error::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Error::NotFound(msg) => write!(f, "Not found: {msg}"),
            Error::State(msg) => write!(f, "State error: {msg}"),
            Error::Io { message, .. } => write!(f, "I/O error: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Network { source, .. }
            | Error::Serialization { source, .. }
            | Error::Io { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn StdError + 'static)),
            _ => None,
        }
    }
}

/// Result type alias for psy operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_display() {
        let error = Error::Network {
            message: "Connection refused".into(),
            source: None,
        };
        assert_eq!(error.to_string(), "Network error: Connection refused");

        let error = Error::Api {
            status: 429,
            kind: "rate_limit_error".into(),
            message: "Rate limit exceeded".into(),
        };
        assert_eq!(
            error.to_string(),
            "API error 429 rate_limit_error: Rate limit exceeded"
        );

        let error = Error::Api {
            status: 502,
            kind: String::new(),
            message: "Bad Gateway".into(),
        };
        assert_eq!(error.to_string(), "API error 502: Bad Gateway");

        let error = Error::validation("invalid score selection: most");
        assert_eq!(
            error.to_string(),
            "Validation error: invalid score selection: most"
        );

        let error = Error::state("batch batch_1 status in_progress has no results");
        assert_eq!(
            error.to_string(),
            "State error: batch batch_1 status in_progress has no results"
        );
    }

    #[test]
    fn test_error_source() {
        let error = Error::Network {
            message: "Connection failed".into(),
            source: None,
        };
        assert!(error.source().is_none());

        let io_error = io::Error::new(io::ErrorKind::NotFound, "missing");
        let error = Error::io("answers.csv", io_error);
        assert!(error.source().is_some());
        assert_eq!(error.to_string(), "I/O error: answers.csv: missing");

        let error = Error::Validation("test".into());
        assert!(error.source().is_none());
    }

    #[test]
    fn test_error_from_serde_json_error() {
        let json_error = serde_json::from_str::<String>("invalid json").unwrap_err();
        let error: Error = json_error.into();

        match error {
            Error::Serialization { message, source } => {
                assert!(!message.is_empty());
                assert!(source.is_some());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_status() {
        let error = Error::Api {
            status: 404,
            kind: String::new(),
            message: "no such model".into(),
        };
        assert_eq!(error.status(), Some(404));
        assert_eq!(Error::validation("x").status(), None);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
