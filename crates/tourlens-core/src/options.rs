//! Per-view image options and resolved sources

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::file_uri;

/// Default skeleton block color
pub const DEFAULT_SKELETON_COLOR: &str = "#E1E4E8";

/// Default fallback glyph color
pub const DEFAULT_FALLBACK_COLOR: &str = "#9AA0A6";

/// Load priority of an image view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Thumbnails: no loading placeholder
    Low,
    #[default]
    Normal,
    /// Above-the-fold content: prefetched eagerly
    High,
}

/// Glyph shown when an image cannot be displayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackGlyph {
    /// Icon name understood by the host's icon set
    pub icon: String,
    pub size: f32,
    pub color: String,
}

impl Default for FallbackGlyph {
    fn default() -> Self {
        Self {
            icon: "image-outline".to_string(),
            size: 24.0,
            color: DEFAULT_FALLBACK_COLOR.to_string(),
        }
    }
}

/// Options of a single image view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Target width in layout units, used to size the skeleton
    #[serde(default)]
    pub width: Option<f32>,
    /// Target height in layout units, used to size the skeleton
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub fallback: FallbackGlyph,
    /// Show a placeholder while loading
    #[serde(default = "default_true")]
    pub show_loader: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Placeholder is a solid skeleton block (otherwise a spinner)
    #[serde(default = "default_true")]
    pub skeleton: bool,
    #[serde(default = "default_skeleton_color")]
    pub skeleton_color: String,
    /// Fade the image in on its first load
    #[serde(default)]
    pub fade_in: bool,
    #[serde(default = "default_fade_in_ms")]
    pub fade_in_ms: u64,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            fallback: FallbackGlyph::default(),
            show_loader: true,
            priority: Priority::Normal,
            skeleton: true,
            skeleton_color: default_skeleton_color(),
            fade_in: false,
            fade_in_ms: default_fade_in_ms(),
        }
    }
}

impl ImageOptions {
    /// List thumbnails: low priority, no placeholder
    pub fn thumbnail() -> Self {
        Self {
            priority: Priority::Low,
            show_loader: false,
            ..Self::default()
        }
    }

    /// Large header images: prefetched eagerly and faded in
    pub fn hero() -> Self {
        Self {
            priority: Priority::High,
            fade_in: true,
            ..Self::default()
        }
    }

    /// Profile pictures: person glyph on failure
    pub fn avatar() -> Self {
        Self {
            fallback: FallbackGlyph {
                icon: "person-circle-outline".to_string(),
                ..FallbackGlyph::default()
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, icon: impl Into<String>, size: f32, color: impl Into<String>) -> Self {
        self.fallback = FallbackGlyph {
            icon: icon.into(),
            size,
            color: color.into(),
        };
        self
    }

    #[must_use]
    pub fn with_loader(mut self, show_loader: bool) -> Self {
        self.show_loader = show_loader;
        self
    }

    #[must_use]
    pub fn with_skeleton(mut self, skeleton: bool, color: impl Into<String>) -> Self {
        self.skeleton = skeleton;
        self.skeleton_color = color.into();
        self
    }

    #[must_use]
    pub fn with_fade_in(mut self, duration: Duration) -> Self {
        self.fade_in = true;
        self.fade_in_ms = duration.as_millis() as u64;
        self
    }

    pub fn fade_in_duration(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    /// Whether a loading placeholder may be shown at all
    pub fn placeholder_enabled(&self) -> bool {
        self.show_loader && self.priority != Priority::Low
    }
}

fn default_true() -> bool {
    true
}

fn default_skeleton_color() -> String {
    DEFAULT_SKELETON_COLOR.to_string()
}

fn default_fade_in_ms() -> u64 {
    200
}

/// Where a view's image comes from after resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageSource {
    /// Handed to the renderer as given (remote, or a scheme the cache skips)
    Uri(String),
    /// Served from the disk cache
    Cached(PathBuf),
}

impl ImageSource {
    /// URI handed to the rendering primitive
    pub fn uri(&self) -> String {
        match self {
            ImageSource::Uri(uri) => uri.clone(),
            ImageSource::Cached(path) => file_uri(path),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ImageSource::Cached(_))
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            ImageSource::Cached(path) => Some(path),
            ImageSource::Uri(_) => None,
        }
    }
}
