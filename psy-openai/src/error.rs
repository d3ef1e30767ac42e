//! Conversions from transport and provider failures to core errors

use psy_core::Error as CoreError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

/// Convert network errors to core errors
pub fn network_error(error: reqwest::Error) -> CoreError {
    CoreError::Network {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
}

/// Convert serialization errors to core errors
pub fn serialization_error(error: serde_json::Error) -> CoreError {
    CoreError::Serialization {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
}

/// Build an API error from a non-success status and its response body
///
/// The provider wraps failures in `{"error": {"message", "type", "param", "code"}}`.
/// Bodies that do not match fall back to the raw text.
pub fn api_error(status: u16, body: &[u8]) -> CoreError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            let message = match error.param.filter(|p| !p.is_empty()) {
                Some(param) => format!("{} (param {param})", error.message),
                None => error.message,
            };
            CoreError::Api {
                status,
                kind: error.kind.unwrap_or_default(),
                message,
            }
        }
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            CoreError::Api {
                status,
                kind: String::new(),
                message: if text.is_empty() {
                    "no response body".to_string()
                } else {
                    text
                },
            }
        }
    }
}
