//! Connection settings for the remote table store.

use std::env;
use std::time::Duration;

/// Environment variable holding the store base URL.
pub const URL_ENV: &str = "TRACKER_URL";
/// Environment variable holding the store API key.
pub const API_KEY_ENV: &str = "TRACKER_API_KEY";
/// Environment variable holding the per-request timeout in seconds.
pub const TIMEOUT_ENV: &str = "TRACKER_TIMEOUT_SECS";

pub const DEFAULT_URL: &str = "http://localhost:54321";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved remote store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL; tables live under `{url}/rest/v1/`.
    pub url: String,
    /// Sent as both `apikey` and bearer token when present.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Resolve settings.
    ///
    /// Priority for each field:
    /// 1. Explicit parameter
    /// 2. `TRACKER_URL` / `TRACKER_API_KEY` / `TRACKER_TIMEOUT_SECS`
    /// 3. Default: http://localhost:54321, no key, 30 seconds
    pub fn resolve(url: Option<String>, api_key: Option<String>, timeout_secs: Option<u64>) -> Self {
        let url = url
            .or_else(|| env::var(URL_ENV).ok())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let api_key = api_key
            .or_else(|| env::var(API_KEY_ENV).ok())
            .filter(|k| !k.is_empty());

        // Unparseable or zero values fall back to the default.
        let timeout = timeout_secs
            .or_else(|| env::var(TIMEOUT_ENV).ok().and_then(|s| s.trim().parse().ok()))
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            url,
            api_key,
            timeout,
        }
    }
}
