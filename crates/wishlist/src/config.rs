//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `NECTAR_STOREFRONT_URL` - Storefront base URL (default: `http://127.0.0.1:3000`)
//! - `NECTAR_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `NECTAR_WISHLIST_CACHE_TTL_SECS` - Server view TTL (default: 300)
//! - `NECTAR_WISHLIST_SLOT` - Local storage slot key (default: `nectar.wishlist`)
//! - `NECTAR_WISHLIST_MERGE_POLICY` - `retain` or `discard` (default: `retain`)

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::merge::MergePolicy;

/// Default local storage slot key.
pub const DEFAULT_SLOT_KEY: &str = "nectar.wishlist";

const DEFAULT_STOREFRONT_URL: &str = "http://127.0.0.1:3000";

/// Wishlist client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Storefront base URL.
    pub storefront_url: Url,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// How long a fetched server view stays fresh.
    pub cache_ttl: Duration,
    /// Key of the device-local slot.
    pub slot_key: String,
    /// What happens to ids whose merge add failed.
    pub merge_policy: MergePolicy,
}

impl ClientConfig {
    /// Configuration for `storefront_url` with default timeouts, slot key,
    /// and merge policy.
    #[must_use]
    pub fn new(storefront_url: Url) -> Self {
        Self {
            storefront_url,
            http_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(300),
            slot_key: DEFAULT_SLOT_KEY.to_string(),
            merge_policy: MergePolicy::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let storefront_url = get_parsed_or_default("NECTAR_STOREFRONT_URL", DEFAULT_STOREFRONT_URL)?;
        let http_timeout = get_secs_or_default("NECTAR_HTTP_TIMEOUT_SECS", 10)?;
        let cache_ttl = get_secs_or_default("NECTAR_WISHLIST_CACHE_TTL_SECS", 300)?;
        let slot_key = std::env::var("NECTAR_WISHLIST_SLOT")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SLOT_KEY.to_string());
        let merge_policy = get_parsed_or_default("NECTAR_WISHLIST_MERGE_POLICY", "retain")?;

        Ok(Self {
            storefront_url,
            http_timeout,
            cache_ttl,
            slot_key,
            merge_policy,
        })
    }

    /// Override the local slot key.
    #[must_use]
    pub fn with_slot_key(mut self, key: impl Into<String>) -> Self {
        self.slot_key = key.into();
        self
    }

    /// Override the merge policy.
    #[must_use]
    pub const fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Override the server view TTL.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string());
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_secs_or_default(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = get_parsed_or_default(key, &default.to_string())?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
