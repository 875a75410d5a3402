//! Disk store for downloaded images
//!
//! Each cached image lives at `{cache_dir}/{key}.img`, where the key is
//! derived from the source URL (see [`crate::key`]). There is no manifest:
//! the presence of the file is the cache entry, and the key is a pure
//! function of the URL, so the same URL always maps to the same path.
//!
//! Writes go through a uniquely named `.part` file that is renamed into
//! place, so a reader never observes a half-written entry and concurrent
//! writers of the same URL simply race to an identical result.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::key::KeyScheme;

/// Extension of a complete cache entry
pub const ENTRY_EXTENSION: &str = "img";

/// Extension of an in-progress download
pub const PARTIAL_EXTENSION: &str = "part";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Not a remote URL: {0}")]
    NotRemote(String),
}

/// Whether a URL should go through the disk cache
///
/// Only `http://` and `https://` URLs are cached; everything else is handed
/// to the renderer unchanged.
pub fn is_remote(url: &str) -> bool {
    starts_with_ignore_case(url, "http://") || starts_with_ignore_case(url, "https://")
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Render a local path as a `file://` URI
pub fn file_uri(path: &Path) -> String {
    let display = path.display().to_string();
    if display.starts_with('/') {
        format!("file://{}", display)
    } else {
        format!("file:///{}", display.replace('\\', "/"))
    }
}

/// Disk-backed image store
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Dedicated image directory
    dir: PathBuf,
    /// URL to key scheme
    scheme: KeyScheme,
}

impl DiskStore {
    /// Create a store over `dir`; the directory is created lazily
    pub fn new(dir: PathBuf, scheme: KeyScheme) -> Self {
        Self { dir, scheme }
    }

    /// Create a store from cache configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.cache_dir(), config.key_scheme)
    }

    /// The image directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Cache key for a URL
    pub fn key_for(&self, url: &str) -> String {
        self.scheme.derive(url)
    }

    /// Path where the entry for `url` is (or would be) stored
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.key_for(url), ENTRY_EXTENSION))
    }

    /// Create the image directory if it is missing
    pub fn try_ensure_dir(&self) -> Result<(), StoreError> {
        if self.dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        info!(path = %self.dir.display(), "Created image cache directory");
        Ok(())
    }

    /// Idempotent directory setup that never fails
    ///
    /// Returns false when the directory could not be created; callers then
    /// keep serving remote URLs.
    pub fn ensure_dir(&self) -> bool {
        match self.try_ensure_dir() {
            Ok(()) => true,
            Err(e) => {
                debug!(path = %self.dir.display(), error = %e, "Image cache directory unavailable");
                false
            }
        }
    }

    /// Check whether `url` has a cached entry
    pub fn contains(&self, url: &str) -> bool {
        self.path_for(url).is_file()
    }

    /// Return the cached path for `url`, if present
    ///
    /// A hit refreshes the entry's modification time so that eviction by
    /// mtime approximates least-recently-used order.
    pub fn lookup(&self, url: &str) -> Option<PathBuf> {
        let path = self.path_for(url);
        if !path.is_file() {
            return None;
        }
        if let Err(e) = touch(&path) {
            debug!(path = %path.display(), error = %e, "Failed to refresh cache entry mtime");
        }
        Some(path)
    }

    /// Store downloaded bytes for `url`, returning the entry path
    pub fn store(&self, url: &str, content: &[u8]) -> Result<PathBuf, StoreError> {
        if !is_remote(url) {
            return Err(StoreError::NotRemote(url.to_string()));
        }
        self.try_ensure_dir()?;

        let path = self.path_for(url);
        let partial = self.dir.join(format!(
            "{}.{}.{}.{}",
            self.key_for(url),
            ENTRY_EXTENSION,
            uuid::Uuid::new_v4().simple(),
            PARTIAL_EXTENSION
        ));

        let written = write_file(&partial, content).and_then(|()| fs::rename(&partial, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = content.len(), "Stored cache entry");
        Ok(path)
    }

    /// Remove the entry for `url`; returns whether a file was removed
    pub fn remove(&self, url: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.path_for(url)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn touch(path: &Path) -> std::io::Result<()> {
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}
