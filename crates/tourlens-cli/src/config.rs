//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tourlens_core::{CacheConfig, EvictionConfig};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub prefetch: PrefetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// URLs warmed per batch when reading from a list file
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    10 // One screen of list items
}

impl Config {
    /// Apply command-line overrides
    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        if let Some(root) = root {
            self.cache.root = root;
        }
        self
    }

    /// Reject values that would make the cache unusable
    pub fn validate(&self) -> Result<()> {
        if self.cache.subdir.trim().is_empty() {
            anyhow::bail!("cache.subdir must not be empty");
        }
        if Path::new(&self.cache.subdir).is_absolute() {
            anyhow::bail!("cache.subdir must be relative to cache.root");
        }
        if self.prefetch.batch_size == 0 {
            anyhow::bail!("prefetch.batch_size must be at least 1");
        }
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let mut config = Config::default();
    config.cache.eviction = EvictionConfig {
        max_size_mb: Some(256),
        max_age_days: Some(30),
    };

    let content = toml::to_string_pretty(&config)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tourlens_core::KeyScheme;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.cache.subdir, "images");
        assert_eq!(config.prefetch.batch_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tourlens.toml");
        std::fs::write(
            &path,
            r#"
            [cache]
            root = "/data/cache"
            key_scheme = "sha256"

            [cache.eviction]
            max_age_days = 7

            [prefetch]
            batch_size = 4
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cache.root, PathBuf::from("/data/cache"));
        assert_eq!(config.cache.key_scheme, KeyScheme::Sha256);
        assert_eq!(config.cache.eviction.max_age_days, Some(7));
        assert_eq!(config.prefetch.batch_size, 4);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "[cache\nroot = 1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.cache.subdir = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.prefetch.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_default_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf/tourlens.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cache.eviction.max_size_mb, Some(256));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_root_override() {
        let config = Config::default().with_root(Some(PathBuf::from("/override")));
        assert_eq!(config.cache.cache_dir(), PathBuf::from("/override/images"));
    }
}
