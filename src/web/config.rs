//! Listener settings for the metrics server.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Where the exporter listens and which optional endpoints it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    /// Interface address, `0.0.0.0` for all
    pub host: String,
    pub port: u16,
    /// Serve the JSON status snapshot under /api/status
    pub enable_status_api: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_status_api: true,
        }
    }
}

impl WebConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable the JSON status endpoint.
    pub fn with_status_api(mut self, enable: bool) -> Self {
        self.enable_status_api = enable;
        self
    }

    /// `host:port` as configured.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the bind address. Only literal IP addresses are accepted.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address()
            .parse::<SocketAddr>()
            .map_err(|e| ExporterError::config_error(format!("invalid bind address {:?}: {e}", self.bind_address())))
    }
}
