//! OpenAI gateway configuration

use crate::constants::{
    API_KEY_ENV, BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, ORG_ID_ENV,
};
use psy_core::Error;
use std::time::Duration;

/// Configuration for the OpenAI gateway
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for the API, without a trailing slash
    pub base_url: String,
    /// Optional organization ID
    pub organization_id: Option<String>,
    /// Timeout applied to every call
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Create a new configuration with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            organization_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read the configuration from `OPENAI_API_KEY`, `OPENAI_ORG_ID` and
    /// `OPENAI_BASE_URL`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is unset or empty.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration(format!("{API_KEY_ENV} is not set")))?;
        let mut config = Self::new(api_key.trim());
        if let Some(org) = std::env::var(ORG_ID_ENV).ok().filter(|o| !o.is_empty()) {
            config = config.with_organization(org);
        }
        if let Some(url) = std::env::var(BASE_URL_ENV).ok().filter(|u| !u.is_empty()) {
            config = config.with_base_url(url);
        }
        Ok(config)
    }

    /// Set a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the organization ID
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization_id = Some(org.into());
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL for an API path such as "/models"
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = OpenAIConfig::new("sk-test")
            .with_base_url("http://localhost:8080/v1/")
            .with_organization("org-1")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.url("/models"), "http://localhost:8080/v1/models");
        assert_eq!(config.organization_id.as_deref(), Some("org-1"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_defaults() {
        let config = OpenAIConfig::new("sk-test");
        assert_eq!(config.url("/files"), "https://api.openai.com/v1/files");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.organization_id.is_none());
    }
}
