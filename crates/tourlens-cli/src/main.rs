//! Tourlens CLI - Image cache maintenance
//!
//! Inspects, warms and prunes the on-disk image cache shared with the app.

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tourlens_cache::ImageCache;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tourlens")]
#[command(about = "Inspect, warm and prune the Tourlens image cache")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tourlens.toml")]
    config: PathBuf,

    /// Cache root directory (overrides configuration)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the cache key and file path for a URL
    Key { url: String },
    /// Resolve URLs through the cache, downloading misses
    Resolve {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Warm the cache for a list of URLs
    Prefetch {
        urls: Vec<String>,
        /// File with one URL per line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show cache statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove old entries or shrink the cache
    Prune {
        #[arg(long)]
        max_size_mb: Option<u64>,
        #[arg(long)]
        max_age_days: Option<u64>,
    },
    /// Remove every cached file
    Clear,
    /// Write a default configuration file
    InitConfig { path: Option<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Tourlens v{}", env!("CARGO_PKG_VERSION"));

    if let Command::InitConfig { path } = &args.command {
        let path = path.clone().unwrap_or_else(|| args.config.clone());
        config::save_default_config(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    // Load configuration
    let config = config::load_config(&args.config)?.with_root(args.root.clone());
    config.validate()?;

    info!(
        path = %config.cache.cache_dir().display(),
        key_scheme = ?config.cache.key_scheme,
        "Configuration loaded"
    );

    let cache = ImageCache::from_config(config.cache.clone())
        .context("Failed to create image cache")?;

    match args.command {
        Command::Key { url } => commands::key(&cache, &url),
        Command::Resolve { urls } => commands::resolve(&cache, &urls).await,
        Command::Prefetch { urls, file } => {
            let urls = commands::collect_urls(&urls, file.as_deref())?;
            if urls.is_empty() {
                anyhow::bail!("No URLs given");
            }
            commands::prefetch(&cache, &config, &urls).await;
        }
        Command::Stats { json } => commands::stats(&cache, json)?,
        Command::Prune {
            max_size_mb,
            max_age_days,
        } => {
            let policy = commands::prune_policy(&config, max_size_mb, max_age_days);
            commands::prune(&cache, &policy)?;
        }
        Command::Clear => commands::clear(&cache)?,
        Command::InitConfig { .. } => {}
    }

    Ok(())
}
