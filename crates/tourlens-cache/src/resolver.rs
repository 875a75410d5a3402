//! Resolving remote URLs to cached files
//!
//! Resolution checks the disk store first and downloads on a miss. It never
//! fails: any I/O or network problem falls back to the original URL so the
//! renderer can still try the remote copy.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tourlens_core::{is_remote, DiskStore, ImageSource, StoreError};
use tracing::debug;

use crate::fetch::{FetchError, Fetcher};

/// Characters of a URL kept in log lines
const LOG_URL_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Shorten a URL for diagnostics
pub fn truncate_url(url: &str) -> String {
    match url.char_indices().nth(LOG_URL_LEN) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}

/// Disk store plus the fetcher that fills it
#[derive(Clone)]
pub struct DiskResolver {
    store: DiskStore,
    fetcher: Arc<dyn Fetcher>,
}

impl DiskResolver {
    pub fn new(store: DiskStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &DiskStore {
        &self.store
    }

    /// Resolve `url` to a cached file, downloading it on a miss
    ///
    /// Non-remote inputs come back unchanged. Failures come back as the
    /// original URL.
    pub async fn resolve(&self, url: &str) -> ImageSource {
        if !is_remote(url) {
            return ImageSource::Uri(url.to_string());
        }
        if !self.store.ensure_dir() {
            return ImageSource::Uri(url.to_string());
        }

        if let Some(path) = self.store.lookup(url) {
            debug!(url = %truncate_url(url), path = %path.display(), "Image cache hit");
            return ImageSource::Cached(path);
        }

        match self.download(url).await {
            Ok(path) => ImageSource::Cached(path),
            Err(e) => {
                debug!(url = %truncate_url(url), error = %e, "Image download failed, using remote URL");
                ImageSource::Uri(url.to_string())
            }
        }
    }

    /// Download `url` into the store unconditionally
    pub async fn download(&self, url: &str) -> Result<PathBuf, CacheError> {
        let content = self.fetcher.fetch(url).await?;
        let path = self.store.store(url, &content)?;
        debug!(url = %truncate_url(url), path = %path.display(), "Cached remote image");
        Ok(path)
    }

    /// Make sure `url` is on disk, reporting failures
    pub async fn warm(&self, url: &str) -> Result<PathBuf, CacheError> {
        match self.store.lookup(url) {
            Some(path) => Ok(path),
            None => self.download(url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use tempfile::TempDir;
    use tourlens_core::KeyScheme;

    fn resolver(temp: &TempDir, fetcher: Arc<MockFetcher>) -> DiskResolver {
        DiskResolver::new(
            DiskStore::new(temp.path().join("images"), KeyScheme::Legacy),
            fetcher,
        )
    }

    #[test]
    fn test_truncate_url() {
        assert_eq!(truncate_url("https://a.b/c"), "https://a.b/c");
        let long = format!("https://example.com/{}", "p".repeat(100));
        let short = truncate_url(&long);
        assert_eq!(short.chars().count(), LOG_URL_LEN + 3);
        assert!(short.ends_with("..."));
    }

    #[tokio::test]
    async fn test_cold_then_warm() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let resolver = resolver(&temp, fetcher.clone());
        let url = "https://example.com/a.jpg";

        let first = resolver.resolve(url).await;
        assert_eq!(first, ImageSource::Cached(resolver.store().path_for(url)));
        assert_eq!(fetcher.calls(url), 1);

        // Network now fails; the disk copy still serves
        fetcher.fail_all(true);
        let second = resolver.resolve(url).await;
        assert_eq!(second, first);
        assert_eq!(fetcher.calls(url), 1);
    }

    #[tokio::test]
    async fn test_non_remote_passthrough() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let resolver = resolver(&temp, fetcher.clone());

        for input in ["file:///tmp/a.jpg", "asset:/logo.png", "not a url", ""] {
            assert_eq!(resolver.resolve(input).await, ImageSource::Uri(input.to_string()));
        }
        assert_eq!(fetcher.total_calls(), 0);
        assert!(!resolver.store().dir().exists());
    }

    #[tokio::test]
    async fn test_download_failure_falls_back() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.fail_all(true);
        let resolver = resolver(&temp, fetcher.clone());
        let url = "https://unreachable.invalid/a.jpg";

        assert_eq!(resolver.resolve(url).await, ImageSource::Uri(url.to_string()));
        assert!(!resolver.store().contains(url));
        assert!(resolver.warm(url).await.is_err());
    }

    #[tokio::test]
    async fn test_unusable_cache_dir_falls_back() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let fetcher = Arc::new(MockFetcher::new());
        let resolver = DiskResolver::new(
            DiskStore::new(blocker.join("images"), KeyScheme::Legacy),
            fetcher.clone(),
        );
        let url = "https://example.com/a.jpg";

        assert_eq!(resolver.resolve(url).await, ImageSource::Uri(url.to_string()));
        assert_eq!(fetcher.total_calls(), 0);
    }
}
