//! Downloading image bytes
//!
//! The [`Fetcher`] trait is the seam between the cache and the network.
//! [`HttpFetcher`] is the production implementation on top of `reqwest`.

use async_trait::async_trait;
use thiserror::Error;
use tourlens_core::{is_remote, CacheConfig};
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("HTTP request failed: {0}")]
    Transport(String),
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Source of image bytes
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download the full body at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher honoring the configured timeout and user agent
    pub fn new(config: &CacheConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if !is_remote(url) {
            return Err(FetchError::UnsupportedScheme(url.to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        debug!(url = %url, bytes = body.len(), "Downloaded image");
        Ok(body.to_vec())
    }
}
