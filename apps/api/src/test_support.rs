//! Helpers shared by tests that need a real HTTP peer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use crate::fallback::fallback_reviews;
use crate::models::{Review, SOURCE_LIVE};
use crate::source::{ReviewSource, SourceError};

/// Serves `router` on an ephemeral localhost port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a localhost port nothing is listening on.
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Scripted review source. Pops one queued outcome per call; once the
/// script runs out it keeps answering with live reviews.
#[derive(Default)]
pub struct StubSource {
    script: Mutex<VecDeque<Result<Vec<Review>, SourceError>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn then(self, outcome: Result<Vec<Review>, SourceError>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewSource for StubSource {
    async fn fetch(&self) -> Result<Vec<Review>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(live_reviews(3)))
    }
}

/// `n` reviews tagged live, distinct from the fallback set.
pub fn live_reviews(n: usize) -> Vec<Review> {
    fallback_reviews()
        .into_iter()
        .cycle()
        .take(n)
        .enumerate()
        .map(|(i, mut review)| {
            review.id = format!("live_{i}");
            review.source = SOURCE_LIVE.to_string();
            review
        })
        .collect()
}
