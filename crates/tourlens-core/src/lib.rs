//! Tourlens Core - Cache keys, disk store and view options
//!
//! This crate provides the filesystem side of the Tourlens image cache:
//! - URL to cache key derivation (legacy rolling hash or SHA-256 prefix)
//! - The disk store mapping keys to `{key}.img` files
//! - Opt-in eviction, statistics and clearing
//! - Cache configuration and per-view image options

pub mod config;
pub mod eviction;
pub mod key;
pub mod options;
pub mod store;

pub use config::{CacheConfig, EvictionConfig};
pub use eviction::{days_to_duration, mb_to_bytes, CacheStats, EvictionPolicy, PruneReport};
pub use key::{sha256_hex, KeyScheme};
pub use options::{FallbackGlyph, ImageOptions, ImageSource, Priority};
pub use store::{file_uri, is_remote, DiskStore, StoreError};
