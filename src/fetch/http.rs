//! reqwest-backed fetcher

use super::retry::with_retry;
use super::{FetchResponse, Fetcher, RateLimiter};
use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result, TransportError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// HTTP fetcher with a shared rate limiter and retry policy
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Build a fetcher from configuration, with its own rate limiter
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_limiter(config, RateLimiter::from_config(&config.rate_limit))
    }

    /// Build a fetcher gating on an existing (shared) rate limiter
    pub fn with_limiter(config: &Config, limiter: RateLimiter) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: Some("user_agent".to_string()),
            })?;

        Ok(Self {
            client,
            limiter,
            retry: config.retry.clone(),
        })
    }

    /// The rate limiter metadata fetches go through
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchResponse> {
        self.limiter.acquire().await;
        tracing::debug!(url = %url, "fetching metadata");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, &e))?;

        let status = response.status();
        // Transient statuses go back through the retry loop
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url, &e))?;

        Ok(FetchResponse {
            url: final_url,
            status: status.as_u16(),
            headers,
            body: body.to_vec(),
        })
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::debug!(url = %url, path = %dest.display(), "downloading artifact");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, &e))?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        let partial = partial_path(dest);
        let write_result = async {
            let mut file = tokio::fs::File::create(&partial)
                .await
                .map_err(|source| io_error(&partial, source))?;

            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| TransportError::from_reqwest(url, &e))?
            {
                file.write_all(&chunk)
                    .await
                    .map_err(|source| io_error(&partial, source))?;
            }

            file.flush()
                .await
                .map_err(|source| io_error(&partial, source))?;
            drop(file);

            tokio::fs::rename(&partial, dest)
                .await
                .map_err(|source| io_error(dest, source))?;
            Ok::<(), Error>(())
        }
        .await;

        if let Err(e) = write_result {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %partial.display(),
                        error = %cleanup,
                        "failed to remove partial download"
                    );
                }
            }
            return Err(e);
        }

        Ok(())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        with_retry(&self.retry, || self.fetch_once(url)).await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        with_retry(&self.retry, || self.download_once(url, dest)).await
    }
}

/// Sibling path the body is streamed into before the final rename
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    dest.with_file_name(name)
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    TransportError::Io {
        path: path.to_path_buf(),
        source,
    }
    .into()
}
