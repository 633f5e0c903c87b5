//! Modem polling configuration.

use crate::error::{ExporterError, Result};
use crate::scrape::page::DEFAULT_HOST;
use crate::scrape::status::DEFAULT_PAGE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how often to poll the modem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    /// Scheme and host of the modem
    pub host: String,
    /// Status page path
    pub page: String,
    /// Interval between polls in milliseconds
    pub interval_ms: u64,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            page: DEFAULT_PAGE.to_string(),
            interval_ms: crate::DEFAULT_INTERVAL_MS,
            timeout_ms: crate::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ModemConfig {
    pub fn new(host: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            page: page.into(),
            ..Default::default()
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject settings that cannot work. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(ExporterError::config_error(format!(
                "host must include http:// or https://, got {:?}",
                self.host
            )));
        }
        if self.interval_ms == 0 {
            return Err(ExporterError::config_error("poll interval must be non-zero"));
        }
        if self.timeout_ms == 0 {
            return Err(ExporterError::config_error("request timeout must be non-zero"));
        }
        Ok(())
    }
}
