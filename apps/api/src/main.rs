use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use review_api::clock::{Clock, SystemClock};
use review_api::config::Config;
use review_api::routes::build_router;
use review_api::scheduler::{IntervalTicker, Scheduler};
use review_api::server::{PublishJob, ReviewPublisher, SnapshotCache};
use review_api::source::HttpReviewSource;
use review_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "review_api={level},tower_http={level}",
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting review API v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.public_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.public_dir.display()))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source = Arc::new(
        HttpReviewSource::new(&config.source_url, config.source_timeout)
            .context("Failed to build review source client")?,
    );
    let ttl =
        chrono::Duration::from_std(config.cache_ttl).context("CACHE_TTL_SECS is out of range")?;
    let cache = SnapshotCache::new(&config.cache_file, ttl, clock.clone());
    let publisher = Arc::new(ReviewPublisher::new(
        source,
        cache,
        &config.public_dir,
        clock.clone(),
    ));

    // First tick fires immediately, so reviews.json is generated at startup.
    let scheduler = Scheduler::new(
        IntervalTicker::immediate(config.refresh_interval),
        Arc::new(PublishJob::new(publisher.clone())),
    )
    .spawn();
    info!(
        "Scheduled review updates every {}s",
        config.refresh_interval.as_secs()
    );

    let app = build_router(AppState::new(publisher, clock), &config.public_dir)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");
    info!("  GET  /api/reviews          - Get all reviews");
    info!("  POST /api/reviews/refresh  - Force refresh reviews");
    info!("  GET  /api/health           - Health check");
    info!("  GET  /reviews.json         - Published snapshot");
    info!("Public directory: {}", config.public_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;
    info!("Review API stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}
