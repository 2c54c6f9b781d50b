use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::server::DEFAULT_TTL_SECS;

/// Server configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_url: String,
    pub port: u16,
    pub public_dir: PathBuf,
    pub cache_file: PathBuf,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub source_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            source_url: require_env("REVIEWS_SOURCE_URL")?,
            port: parse_env("PORT", 3001)?,
            public_dir: PathBuf::from(env_or("PUBLIC_DIR", "public")),
            cache_file: PathBuf::from(env_or("CACHE_FILE", "reviews-cache.json")),
            cache_ttl: parse_secs("CACHE_TTL_SECS", DEFAULT_TTL_SECS)?,
            refresh_interval: parse_secs("REFRESH_INTERVAL_SECS", 3600)?,
            source_timeout: parse_secs("SOURCE_TIMEOUT_SECS", 10)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid value, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// A whole number of seconds that must be positive.
fn parse_secs(key: &str, default: u64) -> Result<Duration> {
    let secs: u64 = parse_env(key, default)?;
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}
