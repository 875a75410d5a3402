//! In-memory fetcher for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

use crate::fetch::{FetchError, Fetcher};

/// Counts calls per URL, can fail on demand and can hold fetches open
pub(crate) struct MockFetcher {
    calls: Mutex<HashMap<String, usize>>,
    fail_all: AtomicBool,
    failing: Mutex<HashSet<String>>,
    gate: watch::Sender<bool>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            calls: Mutex::new(HashMap::new()),
            fail_all: AtomicBool::new(false),
            failing: Mutex::new(HashSet::new()),
            gate,
        }
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub(crate) fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_url(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    /// Block fetches until [`MockFetcher::release`]
    pub(crate) fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn release(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        *self.calls.lock().entry(url.to_string()).or_insert(0) += 1;

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().contains(url) {
            return Err(FetchError::Transport(format!("simulated failure for {}", url)));
        }
        Ok(format!("image:{}", url).into_bytes())
    }
}
