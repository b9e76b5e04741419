//! HTTP client module
//!
//! The transport under every service client.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Binary Bodies**: JSON or raw payloads with an explicit content type
//! - **Authentication**: Integration with auth module

mod client;
mod rate_limit;

pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestBody, RequestConfig, RetryPolicy,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
