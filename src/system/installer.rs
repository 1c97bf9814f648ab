//! Fetching third-party installer scripts.
//!
//! Installer endpoints (get.docker.com, tailscale.com/install.sh, the nvm
//! install script) are opaque: the script is downloaded here and handed to
//! `sh`, and only its exit status matters.

use reqwest::blocking::Client;
use std::time::Duration;

use crate::error::StepError;

/// Downloads installer scripts over HTTP(S).
pub struct InstallerFetcher {
    client: Client,
    timeout: Duration,
}

impl InstallerFetcher {
    /// Create a fetcher with a 60-second timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(60))
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(concat!("vpsup/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, timeout }
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Download a script body.
    pub fn fetch(&self, url: &str) -> Result<String, StepError> {
        let fetch_error = |message: String| StepError::Fetch {
            url: url.to_string(),
            message,
        };

        tracing::debug!("Fetching installer {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }

        let body = response.text().map_err(|e| fetch_error(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(fetch_error("empty response".to_string()));
        }

        Ok(body)
    }
}

impl Default for InstallerFetcher {
    fn default() -> Self {
        Self::new()
    }
}
