//! The image cache service
//!
//! One [`ImageCache`] is built at application start and shared by `Arc`
//! with every screen that shows images. It owns the disk resolver and the
//! prefetch registry, so separate instances (tests, multiple accounts) never
//! share state.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tourlens_core::{
    CacheConfig, CacheStats, DiskStore, EvictionPolicy, ImageOptions, ImageSource, PruneReport,
    StoreError,
};
use tracing::info;

use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::prefetch::{PrefetchCoordinator, PrefetchReport};
use crate::resolver::DiskResolver;
use crate::view::ResolvedImage;

/// Shared image cache
pub struct ImageCache {
    config: CacheConfig,
    resolver: DiskResolver,
    prefetcher: PrefetchCoordinator,
}

impl ImageCache {
    /// Create a cache that downloads through `fetcher`
    pub fn new(config: CacheConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let store = DiskStore::from_config(&config);
        store.ensure_dir();

        let resolver = DiskResolver::new(store, fetcher);
        let prefetcher = PrefetchCoordinator::new(Arc::new(resolver.clone()));

        info!(
            path = %resolver.store().dir().display(),
            key_scheme = ?config.key_scheme,
            "Image cache ready"
        );

        Self {
            config,
            resolver,
            prefetcher,
        }
    }

    /// Create a cache that downloads over HTTP(S)
    pub fn from_config(config: CacheConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &DiskStore {
        self.resolver.store()
    }

    pub fn prefetcher(&self) -> &PrefetchCoordinator {
        &self.prefetcher
    }

    /// Resolve a URL through the disk cache; never fails
    ///
    /// A prefetch already downloading `url` is awaited and reused.
    pub async fn resolve(&self, url: &str) -> ImageSource {
        self.prefetcher.settled(url).await;
        self.resolver.resolve(url).await
    }

    /// Warm the cache for a batch of URLs and wait for it
    pub async fn prefetch<I, S>(&self, urls: I) -> PrefetchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prefetcher.prefetch(urls).await
    }

    /// Warm the cache for a batch of URLs in the background
    pub fn spawn_prefetch<I, S>(&self, urls: I) -> JoinHandle<PrefetchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.prefetcher.spawn_prefetch(urls)
    }

    /// New view bound to this cache
    pub fn view(self: &Arc<Self>, options: ImageOptions) -> ResolvedImage {
        ResolvedImage::new(Arc::clone(self), options)
    }

    pub fn stats(&self) -> Result<CacheStats, StoreError> {
        self.store().stats()
    }

    /// Prune with an explicit policy
    pub fn prune(&self, policy: &EvictionPolicy) -> Result<PruneReport, StoreError> {
        self.store().prune(policy)
    }

    /// Prune with the configured limits
    pub fn prune_configured(&self) -> Result<PruneReport, StoreError> {
        self.prune(&EvictionPolicy::from(&self.config.eviction))
    }

    /// Remove all cached files and forget prefetched URLs
    pub fn clear(&self) -> Result<usize, StoreError> {
        let removed = self.store().clear()?;
        self.prefetcher.reset();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use tempfile::TempDir;

    fn cache(temp: &TempDir) -> (Arc<ImageCache>, Arc<MockFetcher>) {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = ImageCache::new(CacheConfig::with_root(temp.path()), fetcher.clone());
        (Arc::new(cache), fetcher)
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let temp = TempDir::new().unwrap();
        let (cache, _) = cache(&temp);
        assert!(cache.store().dir().is_dir());
        assert_eq!(cache.store().dir(), temp.path().join("images"));
    }

    #[tokio::test]
    async fn test_prefetch_then_resolve_uses_disk() {
        let temp = TempDir::new().unwrap();
        let (cache, fetcher) = cache(&temp);
        let url = "https://example.com/tour/1.jpg";

        let report = cache.prefetch([url]).await;
        assert_eq!(report.succeeded, 1);

        let source = cache.resolve(url).await;
        assert!(source.is_cached());
        assert_eq!(fetcher.calls(url), 1);
    }

    #[tokio::test]
    async fn test_prefetch_skips_download_when_on_disk() {
        let temp = TempDir::new().unwrap();
        let (cache, fetcher) = cache(&temp);
        let url = "https://example.com/tour/1.jpg";

        cache.resolve(url).await;
        let report = cache.prefetch([url]).await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(fetcher.calls(url), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_registry() {
        let temp = TempDir::new().unwrap();
        let (cache, fetcher) = cache(&temp);
        let url = "https://example.com/tour/1.jpg";

        cache.prefetch([url]).await;
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.prefetcher().is_empty());

        cache.prefetch([url]).await;
        assert_eq!(fetcher.calls(url), 2);
    }

    #[tokio::test]
    async fn test_stats_and_prune_configured() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::new());
        let mut config = CacheConfig::with_root(temp.path());
        config.eviction.max_size_mb = Some(0);
        let cache = ImageCache::new(config, fetcher);

        cache.resolve("https://example.com/a.jpg").await;
        cache.resolve("https://example.com/b.jpg").await;
        assert_eq!(cache.stats().unwrap().entries, 2);

        let report = cache.prune_configured().unwrap();
        assert_eq!(report.evicted, 2);
        assert_eq!(cache.stats().unwrap().entries, 0);
    }
}
