//! Prefetch coordination
//!
//! Call sites warm the cache ahead of a scroll by handing a batch of URLs to
//! the [`PrefetchCoordinator`]. The coordinator keeps a registry of URLs that
//! are in flight or already warmed and only issues requests for URLs it has
//! not seen:
//! - URLs are claimed under one short lock before any request starts, so
//!   overlapping batches never double-issue
//! - a failed request releases its claim so a later batch may retry
//! - a successful request keeps its claim for the life of the coordinator
//! - anyone about to download a URL can [`settled`](PrefetchCoordinator::settled)
//!   on it first and reuse the in-flight request instead of issuing another

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tourlens_core::is_remote;
use tracing::debug;

use crate::resolver::{truncate_url, CacheError, DiskResolver};

/// Whatever a prefetch request actually does
#[async_trait]
pub trait PrefetchTarget: Send + Sync {
    async fn prefetch_one(&self, url: &str) -> Result<(), CacheError>;
}

#[async_trait]
impl PrefetchTarget for DiskResolver {
    async fn prefetch_one(&self, url: &str) -> Result<(), CacheError> {
        self.warm(url).await.map(|_| ())
    }
}

/// Outcome of one prefetch batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrefetchReport {
    /// Requests issued by this batch
    pub issued: usize,
    /// URLs already registered, repeated in the batch, or not cacheable
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// URLs claimed by one batch, each with its completion signal
#[derive(Debug, Default)]
struct Claim {
    urls: Vec<(String, watch::Sender<bool>)>,
    skipped: usize,
}

/// Registered URL; the flag turns true once its request has finished
type Registry = HashMap<String, watch::Receiver<bool>>;

/// Warmed, or still owned by a running batch
fn is_live(watcher: &watch::Receiver<bool>) -> bool {
    *watcher.borrow() || watcher.has_changed().is_ok()
}

/// Process-wide de-duplicating prefetcher
#[derive(Clone)]
pub struct PrefetchCoordinator {
    registry: Arc<Mutex<Registry>>,
    target: Arc<dyn PrefetchTarget>,
}

impl PrefetchCoordinator {
    pub fn new(target: Arc<dyn PrefetchTarget>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(HashMap::new())),
            target,
        }
    }

    /// Register every new URL of the batch
    fn claim<I, S>(&self, urls: I) -> Claim
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut claim = Claim::default();
        let mut registry = self.registry.lock();
        for url in urls {
            let url = url.as_ref();
            if !is_remote(url) || registry.get(url).is_some_and(is_live) {
                claim.skipped += 1;
                continue;
            }
            let (done, watcher) = watch::channel(false);
            registry.insert(url.to_string(), watcher);
            claim.urls.push((url.to_string(), done));
        }
        claim
    }

    async fn run(&self, claim: Claim) -> PrefetchReport {
        let mut report = PrefetchReport {
            issued: claim.urls.len(),
            skipped: claim.skipped,
            ..PrefetchReport::default()
        };

        let results = join_all(claim.urls.iter().map(|(url, _)| self.target.prefetch_one(url))).await;

        for ((url, done), result) in claim.urls.iter().zip(results) {
            match result {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    self.registry.lock().remove(url);
                    debug!(url = %truncate_url(url), error = %e, "Prefetch failed, released for retry");
                }
            }
            done.send_replace(true);
        }

        report
    }

    /// Prefetch a batch and wait for it
    pub async fn prefetch<I, S>(&self, urls: I) -> PrefetchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let claim = self.claim(urls);
        self.run(claim).await
    }

    /// Prefetch a batch in the background
    ///
    /// URLs are registered before this returns; the requests themselves run
    /// on a spawned task. Must be called from within a Tokio runtime.
    pub fn spawn_prefetch<I, S>(&self, urls: I) -> JoinHandle<PrefetchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let claim = self.claim(urls);
        let this = self.clone();
        tokio::spawn(async move { this.run(claim).await })
    }

    /// Wait until any in-flight request for `url` has finished
    ///
    /// Returns immediately for URLs that are not registered or already
    /// warmed. An aborted batch counts as finished.
    pub async fn settled(&self, url: &str) {
        let watcher = self.registry.lock().get(url).cloned();
        if let Some(mut watcher) = watcher {
            let _ = watcher.wait_for(|done| *done).await;
        }
    }

    /// Whether `url` is in flight or already warmed
    pub fn is_registered(&self, url: &str) -> bool {
        self.registry.lock().get(url).is_some_and(is_live)
    }

    pub fn len(&self) -> usize {
        self.registry.lock().values().filter(|w| is_live(w)).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.registry.lock().values().any(is_live)
    }

    /// Forget every registered URL (e.g. after the disk cache was cleared)
    pub fn reset(&self) {
        self.registry.lock().clear();
    }
}
