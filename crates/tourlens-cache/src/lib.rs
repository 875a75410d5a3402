//! Tourlens Cache - Image resolution, prefetching and view state
//!
//! This crate builds the runtime side of the image cache on top of
//! `tourlens-core`:
//! - A [`Fetcher`] seam with a `reqwest` implementation
//! - Disk resolution that falls back to the remote URL on any failure
//! - A de-duplicating prefetch coordinator
//! - The [`ImageCache`] service shared by every view
//! - [`ResolvedImage`], the per-view loading/error state machine

pub mod fetch;
pub mod prefetch;
pub mod resolver;
pub mod service;
pub mod view;

#[cfg(test)]
mod testing;

pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use prefetch::{PrefetchCoordinator, PrefetchReport, PrefetchTarget};
pub use resolver::{truncate_url, CacheError, DiskResolver};
pub use service::ImageCache;
pub use view::{LoadEvent, Phase, Placeholder, Rendered, ResolvedImage};
