//! Source Fetcher: the only place that talks to the upstream review feed.
//!
//! One request per `fetch()`, bounded by a timeout, no internal retry.
//! Retrying is the caller's business (the scheduler's next tick).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Rating, Review, SOURCE_LIVE};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT: &str = "application/json,text/html;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed: {reason}")]
    Fetch { reason: String },

    #[error("upstream returned status {status}")]
    Status { status: u16 },

    #[error("upstream returned no usable reviews")]
    EmptyResult,

    #[error("upstream payload could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Fetch {
            reason: e.to_string(),
        }
    }
}

/// Anything that can produce a fresh, non-empty list of live reviews.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Review>, SourceError>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedPayload {
    List(Vec<FeedReview>),
    Wrapped { reviews: Vec<FeedReview> },
}

#[derive(Debug, Deserialize)]
struct FeedReview {
    author: Option<String>,
    content: Option<String>,
    #[serde(default)]
    rating: Option<Rating>,
    date: Option<String>,
    avatar: Option<String>,
}

/// Fetches reviews as JSON over HTTP.
#[derive(Clone)]
pub struct HttpReviewSource {
    client: Client,
    url: String,
}

impl HttpReviewSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    async fn fetch(&self) -> Result<Vec<Review>, SourceError> {
        info!("Fetching reviews from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Review source returned {status}");
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let reviews = parse_feed(&body)?;

        info!("Found {} reviews", reviews.len());
        Ok(reviews)
    }
}

/// Turns a feed body into live reviews, dropping entries without an author or
/// content. Each review gets a fresh id. An empty result is an error.
pub fn parse_feed(body: &str) -> Result<Vec<Review>, SourceError> {
    let entries = match serde_json::from_str::<FeedPayload>(body)? {
        FeedPayload::List(entries) => entries,
        FeedPayload::Wrapped { reviews } => reviews,
    };

    let total = entries.len();
    let reviews: Vec<Review> = entries
        .into_iter()
        .filter_map(|entry| {
            let author = entry.author.map(|a| a.trim().to_string()).filter(|a| !a.is_empty())?;
            let content = entry.content.filter(|c| !c.trim().is_empty())?;
            Some(Review {
                id: Uuid::new_v4().to_string(),
                author,
                content,
                rating: entry.rating.unwrap_or_default(),
                date: entry.date,
                source: SOURCE_LIVE.to_string(),
                avatar: entry.avatar,
            })
        })
        .collect();

    if reviews.len() < total {
        debug!("Dropped {} incomplete feed entries", total - reviews.len());
    }

    if reviews.is_empty() {
        return Err(SourceError::EmptyResult);
    }
    Ok(reviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port, serve};
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    #[test]
    fn test_parse_feed_bare_list() {
        let body = r#"[{"author":"Green","content":"nice","rating":"4","date":"2025-10-02T19:06:00.000Z"}]"#;
        let reviews = parse_feed(body).unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].author, "Green");
        assert_eq!(reviews[0].rating.value(), 4);
        assert_eq!(reviews[0].source, SOURCE_LIVE);
    }

    #[test]
    fn test_parse_feed_wrapped_object_keeps_order() {
        let body = r#"{"reviews":[{"author":"A","content":"one"},{"author":"B","content":"two"}]}"#;
        let reviews = parse_feed(body).unwrap();
        let authors: Vec<&str> = reviews.iter().map(|r| r.author.as_str()).collect();
        assert_eq!(authors, vec!["A", "B"]);
        assert_eq!(reviews[0].rating, Rating::MAX);
    }

    #[test]
    fn test_parse_feed_assigns_unique_ids() {
        let body = r#"[{"author":"A","content":"x"},{"author":"A","content":"x"}]"#;
        let reviews = parse_feed(body).unwrap();
        assert_ne!(reviews[0].id, reviews[1].id);
    }

    #[test]
    fn test_parse_feed_empty_is_error() {
        assert!(matches!(parse_feed("[]"), Err(SourceError::EmptyResult)));
        assert!(matches!(
            parse_feed(r#"{"reviews":[]}"#),
            Err(SourceError::EmptyResult)
        ));
    }

    #[test]
    fn test_parse_feed_drops_blank_entries() {
        let body = r#"[{"author":"  ","content":"x"},{"author":"A","content":""},{"content":"y"}]"#;
        assert!(matches!(parse_feed(body), Err(SourceError::EmptyResult)));
    }

    #[test]
    fn test_parse_feed_garbage_is_parse_error() {
        assert!(matches!(parse_feed("<html>"), Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_http_source_non_success_status_fails() {
        let router =
            Router::new().route("/feed", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let base = serve(router).await;
        let source = HttpReviewSource::new(format!("{base}/feed"), DEFAULT_TIMEOUT).unwrap();

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_http_source_returns_live_reviews() {
        let router = Router::new().route(
            "/feed",
            get(|| async {
                Json(json!([{"author": "Zane", "content": "helpful staff", "rating": 5}]))
            }),
        );
        let base = serve(router).await;
        let source = HttpReviewSource::new(format!("{base}/feed"), DEFAULT_TIMEOUT).unwrap();

        let reviews = source.fetch().await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].author, "Zane");
    }

    #[tokio::test]
    async fn test_http_source_unreachable_is_fetch_error() {
        let url = format!("{}/feed", closed_port().await);
        let source = HttpReviewSource::new(url, DEFAULT_TIMEOUT).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_http_source_gives_up_at_timeout() {
        let router = Router::new().route(
            "/feed",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!([{"author": "Zane", "content": "too late"}]))
            }),
        );
        let base = serve(router).await;
        let source =
            HttpReviewSource::new(format!("{base}/feed"), Duration::from_millis(300)).unwrap();

        let started = std::time::Instant::now();
        let err = source.fetch().await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(err, SourceError::Fetch { .. }), "{err}");
    }

    #[test]
    fn test_default_timeout_is_ten_seconds() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(10));
    }
}
