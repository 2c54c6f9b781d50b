//! Review acquisition and distribution.
//!
//! The server side fetches reviews from an upstream feed, caches them for a
//! fixed window, publishes a `reviews.json` snapshot and serves it over HTTP.
//! The client side resolves a displayable review list through its own cache,
//! the API, the published file, and finally a hardcoded set shared with the
//! server.

pub mod cli;
pub mod client;
pub mod clock;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod models;
pub mod render;
pub mod routes;
pub mod scheduler;
pub mod server;
pub mod source;
pub mod state;

#[cfg(test)]
mod test_support;
