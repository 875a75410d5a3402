//! Cache statistics, eviction and clearing
//!
//! Nothing in the cache purges implicitly. A prune pass runs only when a
//! caller asks for one with an [`EvictionPolicy`]; it first drops entries past
//! the age limit, then removes the least recently used entries (oldest mtime
//! first) until the total size fits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use crate::config::EvictionConfig;
use crate::store::{DiskStore, StoreError, ENTRY_EXTENSION};

/// Limits applied by a prune pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Maximum total size in bytes
    pub max_size_bytes: Option<u64>,
    /// Maximum age of an entry
    pub max_age: Option<Duration>,
}

impl EvictionPolicy {
    pub fn is_noop(&self) -> bool {
        self.max_size_bytes.is_none() && self.max_age.is_none()
    }
}

impl From<&EvictionConfig> for EvictionPolicy {
    fn from(config: &EvictionConfig) -> Self {
        Self {
            max_size_bytes: config.max_size_mb.map(mb_to_bytes),
            max_age: config.max_age_days.map(days_to_duration),
        }
    }
}

/// Megabytes to bytes, saturating on huge limits
pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

/// Days to a duration, saturating on huge limits
pub fn days_to_duration(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(24 * 60 * 60))
}

/// Summary of the cache directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Image directory
    pub dir: PathBuf,
    /// Number of complete entries
    pub entries: usize,
    /// Total size of complete entries in bytes
    pub total_bytes: u64,
    /// Modification time of the least recently used entry
    pub oldest: Option<DateTime<Utc>>,
    /// Modification time of the most recently used entry
    pub newest: Option<DateTime<Utc>>,
}

/// Result of a prune pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Entries removed for exceeding the age limit
    pub expired: usize,
    /// Entries removed to fit the size limit
    pub evicted: usize,
    /// Bytes freed
    pub freed_bytes: u64,
    /// Entries left after the pass
    pub remaining: usize,
    /// Bytes left after the pass
    pub remaining_bytes: u64,
}

#[derive(Debug)]
struct EntryFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

impl DiskStore {
    /// Collect complete entries; a missing directory is an empty cache
    fn entries(&self) -> Result<Vec<EntryFile>, StoreError> {
        let read_dir = match fs::read_dir(self.dir()) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != ENTRY_EXTENSION) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            entries.push(EntryFile {
                path,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(entries)
    }

    /// Count and size the cached entries
    pub fn stats(&self) -> Result<CacheStats, StoreError> {
        let entries = self.entries()?;
        Ok(CacheStats {
            dir: self.dir().to_path_buf(),
            entries: entries.len(),
            total_bytes: entries.iter().map(|e| e.size).sum(),
            oldest: entries.iter().map(|e| e.modified).min().map(DateTime::<Utc>::from),
            newest: entries.iter().map(|e| e.modified).max().map(DateTime::<Utc>::from),
        })
    }

    /// Run an eviction pass
    pub fn prune(&self, policy: &EvictionPolicy) -> Result<PruneReport, StoreError> {
        self.prune_at(policy, SystemTime::now())
    }

    fn prune_at(&self, policy: &EvictionPolicy, now: SystemTime) -> Result<PruneReport, StoreError> {
        let mut entries = self.entries()?;
        let mut report = PruneReport::default();

        if !policy.is_noop() {
            // Oldest first
            entries.sort_by_key(|e| e.modified);

            if let Some(max_age) = policy.max_age {
                let mut kept = Vec::with_capacity(entries.len());
                for entry in entries {
                    let age = now.duration_since(entry.modified).unwrap_or_default();
                    if age > max_age && remove_entry(&entry) {
                        report.expired += 1;
                        report.freed_bytes += entry.size;
                    } else {
                        kept.push(entry);
                    }
                }
                entries = kept;
            }

            if let Some(max_size) = policy.max_size_bytes {
                let mut total: u64 = entries.iter().map(|e| e.size).sum();
                let mut kept = Vec::with_capacity(entries.len());
                for entry in entries {
                    if total > max_size && remove_entry(&entry) {
                        total -= entry.size;
                        report.evicted += 1;
                        report.freed_bytes += entry.size;
                    } else {
                        kept.push(entry);
                    }
                }
                entries = kept;
            }
        }

        report.remaining = entries.len();
        report.remaining_bytes = entries.iter().map(|e| e.size).sum();

        info!(
            expired = report.expired,
            evicted = report.evicted,
            freed_bytes = report.freed_bytes,
            remaining = report.remaining,
            "Image cache prune complete"
        );
        Ok(report)
    }

    /// Remove every file in the image directory, keeping the directory
    ///
    /// Returns the number of files removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let read_dir = match fs::read_dir(self.dir()) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!(path = %self.dir().display(), removed = removed, "Cleared image cache");
        Ok(removed)
    }
}

fn remove_entry(entry: &EntryFile) -> bool {
    match fs::remove_file(&entry.path) {
        Ok(()) => true,
        Err(e) => {
            debug!(path = %entry.path.display(), error = %e, "Failed to evict cache entry");
            false
        }
    }
}
