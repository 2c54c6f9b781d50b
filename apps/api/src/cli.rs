//! Command-line interface for the `review-client` binary.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no cache directory given and no platform cache directory available; pass --cache-dir")]
    NoCacheDir,
}

/// Loads reviews through the cache / API / published file / fallback chain
/// and prints them as testimonial HTML.
#[derive(Parser, Debug)]
#[command(name = "review-client")]
#[command(about = "Load and render server reviews with layered fallback")]
#[command(version)]
pub struct Cli {
    /// Base URL of the review server
    #[arg(long, env = "REVIEW_SERVER_URL", default_value = "http://localhost:3001")]
    pub server_url: String,

    /// URL of the published snapshot. Defaults to <server-url>/reviews.json
    #[arg(long, env = "REVIEWS_STATIC_URL")]
    pub static_url: Option<String>,

    /// Where the local review cache lives
    #[arg(long, env = "REVIEW_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Ignore the local cache and reload from the network
    #[arg(long)]
    pub refresh: bool,

    /// Keep running and re-render every 30 minutes
    #[arg(long)]
    pub watch: bool,
}

impl Cli {
    pub fn static_url(&self) -> String {
        self.static_url
            .clone()
            .unwrap_or_else(|| format!("{}/reviews.json", self.server_url.trim_end_matches('/')))
    }
}
