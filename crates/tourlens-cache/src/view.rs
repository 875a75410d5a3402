//! Per-view image state
//!
//! A [`ResolvedImage`] is the state behind one mounted image element. The
//! host UI feeds it the current URL and the load events of its image
//! primitive, and asks it what to draw.
//!
//! ```text
//! Idle ──set_source──▶ Resolving ──Loaded──▶ Loaded
//!                         │  ▲                 │
//!                       Error└──set_source(new)┘
//!                         ▼
//!                       Failed
//! ```
//!
//! - The remote URL is rendered immediately; disk resolution runs on a
//!   background task and swaps in the local file when it finishes.
//! - Disk resolution never ends loading; only the image primitive does.
//! - Once an image has loaded, the placeholder never comes back while the URL
//!   stays the same.
//! - A new URL, or dropping the view, aborts the pending resolution task and
//!   drops its channel, so a late result cannot reach this view.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tourlens_core::{is_remote, FallbackGlyph, ImageOptions, ImageSource, Priority};
use tracing::debug;
use uuid::Uuid;

use crate::resolver::truncate_url;
use crate::service::ImageCache;

/// Lifecycle phase of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No source set yet
    Idle,
    /// Waiting for the image primitive
    Resolving,
    /// Shown at least once; stays loaded while the primitive reloads the
    /// same image from the local file
    Loaded,
    Failed,
}

/// Event reported by the host's image primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    Start,
    Loaded,
    Error,
}

/// Shown over (or instead of) the image while it loads
#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    /// Solid block matching the target size
    Skeleton {
        color: String,
        width: Option<f32>,
        height: Option<f32>,
    },
    Spinner,
}

/// What the host should draw
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Nothing requested yet
    Empty,
    Fallback(FallbackGlyph),
    Image {
        /// URI for the image primitive
        uri: String,
        placeholder: Option<Placeholder>,
        fade_in: Option<Duration>,
    },
}

/// Background disk resolution owned by a view
struct PendingResolution {
    task: JoinHandle<()>,
    rx: oneshot::Receiver<ImageSource>,
}

impl Drop for PendingResolution {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// State of one mounted image
pub struct ResolvedImage {
    id: Uuid,
    cache: Arc<ImageCache>,
    options: ImageOptions,
    mounted: bool,
    source_uri: Option<String>,
    resolved: Option<ImageSource>,
    loading: bool,
    has_loaded_once: bool,
    error: bool,
    pending: Option<PendingResolution>,
}

impl ResolvedImage {
    pub fn new(cache: Arc<ImageCache>, options: ImageOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            cache,
            options,
            mounted: false,
            source_uri: None,
            resolved: None,
            loading: false,
            has_loaded_once: false,
            error: false,
            pending: None,
        }
    }

    /// Set the requested URL
    ///
    /// Setting the URL already shown is a no-op. Any other value resets the
    /// view and, for remote URLs, starts disk resolution on the current
    /// Tokio runtime. Outside a runtime the remote URL is rendered as is.
    pub fn set_source(&mut self, url: Option<&str>) {
        if self.mounted && self.source_uri.as_deref() == url {
            return;
        }

        // Supersede whatever was in flight for the previous URL
        self.pending = None;
        self.mounted = true;
        self.source_uri = url.map(str::to_string);
        self.has_loaded_once = false;

        let url = match url {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                debug!(view = %self.id, "Empty image URL, showing fallback");
                self.resolved = None;
                self.loading = false;
                self.error = true;
                return;
            }
        };

        self.resolved = Some(ImageSource::Uri(url.to_string()));
        self.loading = true;
        self.error = false;

        if is_remote(url) {
            self.pending = self.spawn_resolution(url.to_string());
        }
    }

    /// Start disk resolution; without a runtime the remote URL stays in use
    fn spawn_resolution(&self, url: String) -> Option<PendingResolution> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                debug!(
                    view = %self.id,
                    url = %truncate_url(&url),
                    error = %e,
                    "No runtime, skipping disk resolution"
                );
                return None;
            }
        };

        let (tx, rx) = oneshot::channel();
        let cache = Arc::clone(&self.cache);
        let eager = self.options.priority == Priority::High;

        let task = runtime.spawn(async move {
            if eager {
                cache.prefetch([url.as_str()]).await;
            }
            let source = cache.resolve(&url).await;
            let _ = tx.send(source);
        });

        Some(PendingResolution { task, rx })
    }

    fn apply_resolution(&mut self, source: ImageSource) {
        if let Some(path) = source.local_path() {
            debug!(view = %self.id, path = %path.display(), "Swapped to cached image");
        }
        self.resolved = Some(source);
    }

    /// Apply a finished disk resolution without waiting
    ///
    /// Returns true when the resolved URI changed.
    pub fn poll(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        match pending.rx.try_recv() {
            Ok(source) => {
                self.pending = None;
                self.apply_resolution(source);
                true
            }
            Err(oneshot::error::TryRecvError::Empty) => false,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.pending = None;
                false
            }
        }
    }

    /// Wait for the pending disk resolution, if any
    pub async fn wait_resolution(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let result = (&mut pending.rx).await;
        self.pending = None;
        if let Ok(source) = result {
            self.apply_resolution(source);
        }
    }

    /// Feed an event from the image primitive
    pub fn handle(&mut self, event: LoadEvent) {
        if self.resolved.is_none() {
            return;
        }
        match event {
            LoadEvent::Start => {
                self.loading = true;
            }
            LoadEvent::Loaded => {
                self.loading = false;
                self.error = false;
                self.has_loaded_once = true;
            }
            LoadEvent::Error => {
                self.loading = false;
                self.error = true;
                debug!(
                    view = %self.id,
                    url = %truncate_url(self.source_uri.as_deref().unwrap_or_default()),
                    "Image failed to load"
                );
            }
        }
    }

    /// Replace presentation options without touching load state
    pub fn set_options(&mut self, options: ImageOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        if !self.mounted {
            Phase::Idle
        } else if self.error {
            Phase::Failed
        } else if self.has_loaded_once {
            Phase::Loaded
        } else {
            Phase::Resolving
        }
    }

    pub fn source_uri(&self) -> Option<&str> {
        self.source_uri.as_deref()
    }

    /// URI currently handed to the image primitive
    pub fn resolved_uri(&self) -> Option<String> {
        self.resolved.as_ref().map(ImageSource::uri)
    }

    pub fn resolved_source(&self) -> Option<&ImageSource> {
        self.resolved.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_loaded_once(&self) -> bool {
        self.has_loaded_once
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Whether a disk resolution is still running
    pub fn is_resolving_disk(&self) -> bool {
        self.pending.is_some()
    }

    /// Describe what to draw right now
    pub fn render(&self) -> Rendered {
        if !self.mounted {
            return Rendered::Empty;
        }
        let source = match (&self.resolved, self.error) {
            (Some(source), false) => source,
            _ => return Rendered::Fallback(self.options.fallback.clone()),
        };

        let placeholder = (self.loading && !self.has_loaded_once && self.options.placeholder_enabled())
            .then(|| {
                if self.options.skeleton {
                    Placeholder::Skeleton {
                        color: self.options.skeleton_color.clone(),
                        width: self.options.width,
                        height: self.options.height,
                    }
                } else {
                    Placeholder::Spinner
                }
            });

        Rendered::Image {
            uri: source.uri(),
            placeholder,
            fade_in: self.options.fade_in.then(|| self.options.fade_in_duration()),
        }
    }
}
