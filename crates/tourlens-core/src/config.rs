//! Cache configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::key::KeyScheme;

/// Disk cache and HTTP settings shared by the store and the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Platform cache root; the image directory lives beneath it
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Dedicated subdirectory for image files
    #[serde(default = "default_subdir")]
    pub subdir: String,
    /// URL to cache key scheme
    #[serde(default)]
    pub key_scheme: KeyScheme,
    /// Timeout for a single download in seconds (0 disables the timeout)
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,
    /// User-Agent sent with downloads
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Optional eviction limits, applied only by explicit prune passes
    #[serde(default)]
    pub eviction: EvictionConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            subdir: default_subdir(),
            key_scheme: KeyScheme::default(),
            http_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            eviction: EvictionConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Config rooted at an explicit directory, everything else default
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Full path of the image directory
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.subdir)
    }

    /// Download timeout, `None` when disabled
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }
}

/// Eviction limits; unset fields mean "no limit"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// Maximum total size of cached files in megabytes
    #[serde(default)]
    pub max_size_mb: Option<u64>,
    /// Maximum age of a cached file in days
    #[serde(default)]
    pub max_age_days: Option<u64>,
}

impl EvictionConfig {
    /// Whether any limit is configured
    pub fn is_enabled(&self) -> bool {
        self.max_size_mb.is_some() || self.max_age_days.is_some()
    }
}

fn default_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tourlens")
}

fn default_subdir() -> String {
    "images".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tourlens/{}", env!("CARGO_PKG_VERSION"))
}
