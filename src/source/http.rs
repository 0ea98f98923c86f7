//! HTTP source: `GET /json` against the device web server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};

use super::StatusSource;
use crate::document::StatusDocument;
use crate::error::PollError;

/// Path of the status document on the device.
pub const DEFAULT_STATUS_PATH: &str = "/json";

/// Fetches the status document from a device over HTTP.
///
/// Only a `200 OK` with a JSON object body counts as success. No retry is
/// attempted and, unless one is configured, no timeout is applied.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
    description: String,
}

impl HttpSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> HttpSourceBuilder {
        HttpSourceBuilder::default()
    }

    /// Full URL that is requested on every fetch.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusSource for HttpSource {
    async fn fetch(&self) -> Result<StatusDocument, PollError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PollError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        StatusDocument::from_slice(&body)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for [`HttpSource`].
#[derive(Debug, Default)]
pub struct HttpSourceBuilder {
    endpoint: Option<String>,
    path: Option<String>,
    timeout: Option<Duration>,
}

impl HttpSourceBuilder {
    /// Set the device base URL (e.g., "http://192.168.1.50").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the status document path (default: "/json").
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set a request timeout. By default requests never time out.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the source.
    ///
    /// Connections are always direct; system proxy settings are ignored.
    pub fn build(self) -> Result<HttpSource, PollError> {
        let mut builder = Client::builder().no_proxy();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "http://localhost".to_string());
        let path = self.path.unwrap_or_else(|| DEFAULT_STATUS_PATH.to_string());
        let url = join_url(&endpoint, &path);

        Ok(HttpSource {
            client,
            description: format!("http: {}", url),
            url,
        })
    }
}

/// Join a base URL and a path with exactly one slash between them.
fn join_url(endpoint: &str, path: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    let base = if base.contains("://") {
        base.to_string()
    } else {
        format!("http://{}", base)
    };
    format!("{}/{}", base, path.trim_start_matches('/'))
}
