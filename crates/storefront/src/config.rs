//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_SESSION_EXPIRY_DAYS` - Session inactivity expiry (default: 7)
//! - `STOREFRONT_AUTH_RATE_BURST` - Auth requests per IP before throttling (default: 5)
//! - `STOREFRONT_API_RATE_BURST` - Wishlist reads per IP before throttling (default: 50)
//! - `STOREFRONT_WISHLIST_WRITE_RATE_BURST` - Wishlist adds/removes per IP before
//!   throttling (default and minimum: the guest wishlist cap, 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use nectar_core::MAX_GUEST_WISHLIST_ITEMS;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Days of inactivity before a session expires
    pub session_expiry_days: u16,
    /// Per-IP request limits
    pub rate_limit: RateLimitConfig,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Per-IP burst sizes for the rate-limited route groups.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Burst for `/api/auth/*` (one token replenished every 6 seconds)
    pub auth_burst: u32,
    /// Burst for `GET /api/wishlist` (one token replenished every second)
    pub api_burst: u32,
    /// Burst for `POST`/`DELETE /api/wishlist` (one token replenished every
    /// second). Never below [`MAX_GUEST_WISHLIST_ITEMS`].
    pub wishlist_write_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_burst: 5,
            api_burst: 50,
            wishlist_write_burst: min_write_burst(),
        }
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when unset
    pub dsn: Option<String>,
    /// Environment tag (e.g. "production")
    pub environment: Option<String>,
    /// Fraction of error events to send
    pub sample_rate: f32,
    /// Fraction of transactions to trace
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_expiry_days = get_parsed_or_default("STOREFRONT_SESSION_EXPIRY_DAYS", "7")?;
        if session_expiry_days == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_SESSION_EXPIRY_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_expiry_days,
            rate_limit: RateLimitConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (controls `Secure` cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl RateLimitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            auth_burst: get_burst("STOREFRONT_AUTH_RATE_BURST", "5")?,
            api_burst: get_burst("STOREFRONT_API_RATE_BURST", "50")?,
            wishlist_write_burst: get_write_burst("STOREFRONT_WISHLIST_WRITE_RATE_BURST")?,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: get_rate("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: get_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a rate limiter burst size; governor rejects zero.
fn get_burst(key: &str, default: &str) -> Result<u32, ConfigError> {
    let burst: u32 = get_parsed_or_default(key, default)?;
    if burst == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(burst)
}

/// A login merge sends one add per guest product at once.
#[allow(clippy::cast_possible_truncation)]
const fn min_write_burst() -> u32 {
    MAX_GUEST_WISHLIST_ITEMS as u32
}

/// Parse the wishlist write burst; it must fit a full guest wishlist merge.
fn get_write_burst(key: &str) -> Result<u32, ConfigError> {
    let burst = get_burst(key, &min_write_burst().to_string())?;
    validate_write_burst(key, burst)
}

fn validate_write_burst(key: &str, burst: u32) -> Result<u32, ConfigError> {
    if burst < min_write_burst() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!(
                "must be at least {MAX_GUEST_WISHLIST_ITEMS} to fit a guest wishlist merge"
            ),
        ));
    }
    Ok(burst)
}

/// Parse a sample rate and check it lies in `0.0..=1.0`.
fn get_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    validate_rate(key, get_parsed_or_default(key, default)?)
}

fn validate_rate(key: &str, rate: f32) -> Result<f32, ConfigError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: base_url.to_string(),
            session_expiry_days: 7,
            rate_limit: RateLimitConfig::default(),
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config("http://localhost:3000").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure() {
        assert!(!test_config("http://localhost:3000").is_secure());
        assert!(test_config("https://nectar.shop").is_secure());
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("STOREFRONT_PORT", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "STOREFRONT_PORT"));
        assert_eq!(parse_value::<u16>("STOREFRONT_PORT", " 8080 ").unwrap(), 8080);
    }

    #[test]
    fn test_validate_rate_bounds() {
        assert!(validate_rate("SENTRY_SAMPLE_RATE", 0.0).is_ok());
        assert!(validate_rate("SENTRY_SAMPLE_RATE", 1.0).is_ok());
        assert!(validate_rate("SENTRY_SAMPLE_RATE", 1.5).is_err());
        assert!(validate_rate("SENTRY_SAMPLE_RATE", -0.1).is_err());
    }

    #[test]
    fn test_write_burst_fits_full_guest_merge() {
        let key = "STOREFRONT_WISHLIST_WRITE_RATE_BURST";
        let cap = u32::try_from(MAX_GUEST_WISHLIST_ITEMS).unwrap();

        assert_eq!(validate_write_burst(key, cap).unwrap(), cap);
        assert!(validate_write_burst(key, cap + 1).is_ok());
        assert!(validate_write_burst(key, cap - 1).is_err());
        assert_eq!(RateLimitConfig::default().wishlist_write_burst, cap);
    }
}
