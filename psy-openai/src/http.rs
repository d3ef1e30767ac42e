//! HTTP client abstraction and utilities

use crate::constants::ORGANIZATION_HEADER;
use crate::error;
use bytes::Bytes;
use psy_core::Error;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::multipart::Form;
use serde_json::Value;
use std::time::Duration;

/// HTTP client abstraction
///
/// Every method returns the raw response body on success and a core error
/// built from the provider's error envelope otherwise.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a GET request
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<Bytes, Error>;

    /// Send a POST request with an optional JSON body
    async fn post(&self, url: &str, headers: HeaderMap, body: Option<Value>)
        -> Result<Bytes, Error>;

    /// Send a multipart POST request
    async fn post_multipart(&self, url: &str, headers: HeaderMap, form: Form)
        -> Result<Bytes, Error>;

    /// Send a DELETE request
    async fn delete(&self, url: &str, headers: HeaderMap) -> Result<Bytes, Error>;
}

/// Default HTTP client implementation using reqwest
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new HTTP client with a per-call timeout
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(error::network_error)?;

        Ok(Self { client })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Bytes, Error> {
        let response = request.send().await.map_err(error::network_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(error::network_error)?;
        if !status.is_success() {
            return Err(error::api_error(status.as_u16(), &body));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: HeaderMap) -> Result<Bytes, Error> {
        self.send(self.client.get(url).headers(headers)).await
    }

    async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Option<Value>,
    ) -> Result<Bytes, Error> {
        let mut request = self.client.post(url).headers(headers);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        headers: HeaderMap,
        form: Form,
    ) -> Result<Bytes, Error> {
        self.send(self.client.post(url).headers(headers).multipart(form))
            .await
    }

    async fn delete(&self, url: &str, headers: HeaderMap) -> Result<Bytes, Error> {
        self.send(self.client.delete(url).headers(headers)).await
    }
}

/// Helper to create the authentication headers
pub fn create_headers(api_key: &str, organization_id: Option<&str>) -> Result<HeaderMap, Error> {
    let mut headers = HeaderMap::new();

    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| Error::Configuration(format!("Invalid API key: {e}")))?,
    );

    if let Some(org) = organization_id.filter(|o| !o.is_empty()) {
        headers.insert(
            HeaderName::from_static("openai-organization"),
            HeaderValue::from_str(org).map_err(|e| {
                Error::Configuration(format!("Invalid {ORGANIZATION_HEADER} header: {e}"))
            })?,
        );
    }

    Ok(headers)
}
