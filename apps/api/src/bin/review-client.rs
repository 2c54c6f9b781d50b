//! review-client: resolves reviews the way the website does and prints
//! them as testimonial HTML on stdout. Logs go to stderr.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use review_api::cli::{Cli, CliError};
use review_api::client::{
    AutoRefreshJob, ClientCache, FileStorage, ReviewLoader, RetryPolicy, AUTO_REFRESH_PERIOD,
};
use review_api::clock::SystemClock;
use review_api::models::Review;
use review_api::render::render_reviews;
use review_api::scheduler::{IntervalTicker, Scheduler};
use review_api::server::DEFAULT_TTL_SECS;

fn print_reviews(reviews: &[Review]) {
    let html = render_reviews(reviews, Utc::now());
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(html.as_bytes());
    let _ = stdout.flush();
    info!("Rendered {} reviews", reviews.len());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("review_api=info,review_client=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let storage = match &cli.cache_dir {
        Some(dir) => FileStorage::with_dir(dir.clone()),
        None => FileStorage::new().ok_or(CliError::NoCacheDir)?,
    };
    let ttl = chrono::Duration::seconds(DEFAULT_TTL_SECS as i64);
    let cache = ClientCache::new(Arc::new(storage), ttl, Arc::new(SystemClock));
    let loader = Arc::new(
        ReviewLoader::over_http(cache, &cli.server_url, &cli.static_url(), RetryPolicy::default())
            .context("Failed to build HTTP client")?,
    );

    let reviews = if cli.refresh {
        loader.refresh().await
    } else {
        loader.load().await
    };
    print_reviews(&reviews);

    if !cli.watch {
        return Ok(());
    }

    info!(
        "Auto-refresh started (every {} minutes)",
        AUTO_REFRESH_PERIOD.as_secs() / 60
    );
    let job = Arc::new(AutoRefreshJob::new(loader, print_reviews));
    let scheduler = Scheduler::new(IntervalTicker::delayed(AUTO_REFRESH_PERIOD), job).spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    scheduler.shutdown().await;
    Ok(())
}
