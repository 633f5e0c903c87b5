//! Retrieval of the raw status page.

use crate::error::{ExporterError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

/// Source of raw page bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the document at `url` and return its body.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP fetcher for the modem's LAN interface.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("arris_exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExporterError::config_error(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        trace!(url, "GET");
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        trace!(url, bytes = body.len(), "got page");
        Ok(body)
    }
}
