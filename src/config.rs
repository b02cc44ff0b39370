//! Configuration types for votecounter

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Outbound metadata request gate (N calls per period, process-wide)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum number of metadata requests per window (default: 10)
    #[serde(default = "default_max_calls")]
    pub max_calls: u32,

    /// Length of the window (default: 1 second)
    #[serde(default = "default_period", with = "duration_serde")]
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: default_max_calls(),
            period: default_period(),
        }
    }
}

/// Retry configuration for transient transport failures
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for [`Acquirer`](crate::acquisition::Acquirer)
///
/// Every field has a default, so an empty JSON object is a valid configuration
/// pointing at the official results host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the results host (default: "https://resultados.tse.jus.br/oficial")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Local root under which artifacts are stored (default: "./eleicoes")
    #[serde(default = "default_download_root")]
    pub download_root: PathBuf,

    /// Metadata request rate limit
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Maximum artifact downloads in flight during a bulk run (default: 8)
    ///
    /// Callers with very large batches are still expected to sub-batch; this
    /// only bounds the worker pool within one batch.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Per-request timeout enforced by the transport (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retry behaviour for metadata fetches and downloads
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_root: default_download_root(),
            rate_limit: RateLimitConfig::default(),
            max_concurrent_downloads: default_max_concurrent(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Check the settings that would otherwise stall or deadlock the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_calls == 0 {
            return Err(Error::Config {
                message: "rate limit must allow at least one call per period".to_string(),
                key: Some("rate_limit.max_calls".to_string()),
            });
        }
        if self.rate_limit.period.is_zero() {
            return Err(Error::Config {
                message: "rate limit period must be greater than zero".to_string(),
                key: Some("rate_limit.period".to_string()),
            });
        }
        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "at least one concurrent download is required".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        let multiplier = self.retry.backoff_multiplier;
        if !(multiplier.is_finite() && multiplier >= 1.0) {
            return Err(Error::Config {
                message: format!(
                    "backoff multiplier must be a finite number >= 1.0, got {}",
                    multiplier
                ),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(Error::Config {
                message: format!("base_url '{}' is not an absolute URL", self.base_url),
                key: Some("base_url".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://resultados.tse.jus.br/oficial".to_string()
}

fn default_download_root() -> PathBuf {
    PathBuf::from("eleicoes")
}

fn default_max_calls() -> u32 {
    10
}

fn default_period() -> Duration {
    Duration::from_secs(1)
}

fn default_max_concurrent() -> usize {
    8
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("votecounter/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
