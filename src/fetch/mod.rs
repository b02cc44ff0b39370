//! Rate-limited fetch capability
//!
//! The pipeline consumes the network through the [`Fetcher`] trait:
//! - [`Fetcher::fetch`] retrieves small metadata documents (listings, machine
//!   info) through the process-wide [`RateLimiter`]
//! - [`Fetcher::download`] writes an artifact to a destination path, never
//!   leaving a partial file behind on failure
//!
//! [`HttpFetcher`] is the reqwest-backed implementation; tests substitute
//! a mock server or their own implementation.

mod http;
mod rate_limit;
pub mod retry;

pub use http::HttpFetcher;
pub use rate_limit::RateLimiter;

use crate::error::{Error, Result, TransportError};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Response of a metadata fetch
#[derive(Clone, Debug)]
pub struct FetchResponse {
    /// Final URL of the request
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`TransportError::Status`]
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                url: self.url,
                status: self.status,
            }
            .into())
        }
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }
}

/// Transport capability consumed by the acquisition pipeline
///
/// Implementations must be shareable across concurrent downloads.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a metadata document
    ///
    /// Non-2xx statuses that are not transient are returned as-is so the
    /// caller can decide what they mean.
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;

    /// Download `url` to `dest`
    ///
    /// On error nothing exists at `dest` that was not there before the call.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}
