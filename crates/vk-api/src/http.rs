//! HTTP client abstraction for the VK API
//!
//! Every VK endpoint accepts a URL-encoded form body, so the transport only
//! needs one operation. The trait keeps it mockable in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::sign::Params;

/// Trait for making HTTP requests
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POSTs `params` as a form body and returns the raw response
    async fn post_form(&self, url: &str, params: &Params) -> Result<HttpResponse>;
}

/// Response from an HTTP request
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Returns true if status is in 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as a generic JSON value
    pub fn json_value(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).context("Failed to parse JSON response")
    }
}

/// Production HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new reqwest-based HTTP client
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Creates a client whose requests fail after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post_form(&self, url: &str, params: &Params) -> Result<HttpResponse> {
        let response = self
            .inner
            .post(url)
            .form(params)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(HttpResponse { status, body })
    }
}
