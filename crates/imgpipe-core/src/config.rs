//! Configuration module
//!
//! Client-side settings: where the backend lives, how long HTTP calls may
//! take, the upload size limit and the polling budget. Everything has a
//! default, so an empty environment yields a working local setup.

use std::env;
use std::time::Duration;

use crate::validator::DEFAULT_MAX_FILE_SIZE;

const API_URL: &str = "http://localhost:3000";
const HTTP_TIMEOUT_SECS: u64 = 60;
const POLL_MAX_ATTEMPTS: u32 = 3;
const POLL_RETRY_DELAY_MS: u64 = 3000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base address, without trailing slash.
    pub api_url: String,
    pub http_timeout: Duration,
    pub max_file_size_bytes: u64,
    /// Total processed-images queries per run, first one included.
    pub poll_max_attempts: u32,
    /// Wait between failed processed-images queries.
    pub poll_retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE,
            poll_max_attempts: POLL_MAX_ATTEMPTS,
            poll_retry_delay: Duration::from_millis(POLL_RETRY_DELAY_MS),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment. Callers that want `.env` support
    /// load it first.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparsable numbers fall back to
    /// their defaults; the result is validated before it is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("IMGPIPE_API_URL")
            .or_else(|| lookup("API_URL"))
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let http_timeout_secs = lookup("IMGPIPE_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(HTTP_TIMEOUT_SECS);

        let max_file_size_mb = lookup("IMGPIPE_MAX_FILE_SIZE_MB")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE / (1024 * 1024));

        let poll_max_attempts = lookup("IMGPIPE_POLL_MAX_ATTEMPTS")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(POLL_MAX_ATTEMPTS);

        let poll_retry_delay_ms = lookup("IMGPIPE_POLL_RETRY_DELAY_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(POLL_RETRY_DELAY_MS);

        // Out-of-range limits fall back like unparsable ones.
        let max_file_size_bytes = max_file_size_mb
            .checked_mul(1024 * 1024)
            .unwrap_or(DEFAULT_MAX_FILE_SIZE);

        let config = Self {
            api_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            max_file_size_bytes,
            poll_max_attempts,
            poll_retry_delay: Duration::from_millis(poll_retry_delay_ms),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "IMGPIPE_API_URL must be an http:// or https:// URL, got '{}'",
                self.api_url
            ));
        }

        if self.http_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "IMGPIPE_HTTP_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!(
                "IMGPIPE_MAX_FILE_SIZE_MB must be greater than zero"
            ));
        }

        if self.poll_max_attempts == 0 {
            return Err(anyhow::anyhow!(
                "IMGPIPE_POLL_MAX_ATTEMPTS must be at least 1"
            ));
        }

        Ok(())
    }
}
