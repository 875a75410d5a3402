//! Cache maintenance commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tourlens_cache::ImageCache;
use tourlens_core::{days_to_duration, mb_to_bytes, CacheStats, EvictionPolicy};
use tracing::info;

use crate::config::Config;

/// Print the cache key and entry path for a URL
pub fn key(cache: &ImageCache, url: &str) {
    let store = cache.store();
    println!("key:  {}", store.key_for(url));
    println!("path: {}", store.path_for(url).display());
    println!("cached: {}", store.contains(url));
}

/// Resolve each URL and print the URI a view would render
pub async fn resolve(cache: &ImageCache, urls: &[String]) {
    for url in urls {
        let source = cache.resolve(url).await;
        let marker = if source.is_cached() { "cached" } else { "remote" };
        println!("{}\t{}\t{}", marker, url, source.uri());
    }
}

/// Read prefetch URLs from arguments and an optional list file
pub fn collect_urls(urls: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut all = urls.to_vec();
    if let Some(file) = file {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read URL list {}", file.display()))?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    Ok(all)
}

/// Warm the cache in batches
pub async fn prefetch(cache: &ImageCache, config: &Config, urls: &[String]) {
    let mut totals = tourlens_cache::PrefetchReport::default();
    for batch in urls.chunks(config.prefetch.batch_size) {
        let report = cache.prefetch(batch).await;
        totals.issued += report.issued;
        totals.skipped += report.skipped;
        totals.succeeded += report.succeeded;
        totals.failed += report.failed;
    }
    info!(
        issued = totals.issued,
        succeeded = totals.succeeded,
        failed = totals.failed,
        "Prefetch finished"
    );
    println!(
        "issued {}, skipped {}, succeeded {}, failed {}",
        totals.issued, totals.skipped, totals.succeeded, totals.failed
    );
}

/// Print cache statistics
pub fn stats(cache: &ImageCache, json: bool) -> Result<()> {
    let stats = cache.stats().context("Failed to read cache directory")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", format_stats(&stats));
    }
    Ok(())
}

fn format_stats(stats: &CacheStats) -> String {
    let fmt_time = |t: Option<DateTime<Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    format!(
        "directory: {}\nentries:   {}\nsize:      {:.2} MB\noldest:    {}\nnewest:    {}\n",
        stats.dir.display(),
        stats.entries,
        stats.total_bytes as f64 / (1024.0 * 1024.0),
        fmt_time(stats.oldest),
        fmt_time(stats.newest),
    )
}

/// Build the prune policy from flags, falling back to configuration
pub fn prune_policy(config: &Config, max_size_mb: Option<u64>, max_age_days: Option<u64>) -> EvictionPolicy {
    let configured = EvictionPolicy::from(&config.cache.eviction);
    EvictionPolicy {
        max_size_bytes: max_size_mb.map(mb_to_bytes).or(configured.max_size_bytes),
        max_age: max_age_days.map(days_to_duration).or(configured.max_age),
    }
}

pub fn prune(cache: &ImageCache, policy: &EvictionPolicy) -> Result<()> {
    if policy.is_noop() {
        println!("No eviction limits configured; nothing to prune");
        return Ok(());
    }
    let report = cache.prune(policy).context("Prune failed")?;
    println!(
        "expired {}, evicted {}, freed {} bytes, {} entries remain",
        report.expired, report.evicted, report.freed_bytes, report.remaining
    );
    Ok(())
}

pub fn clear(cache: &ImageCache) -> Result<()> {
    let removed = cache.clear().context("Failed to clear cache")?;
    println!("removed {} files", removed);
    Ok(())
}
