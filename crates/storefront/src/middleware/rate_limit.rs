//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: strict limits for login/registration (~10/min)
//! - `api_rate_limiter`: relaxed limits for wishlist reads (~60/min)
//! - `wishlist_write_rate_limiter`: wishlist adds/removes, sized for a login merge

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP key extractor.
///
/// Prefers proxy headers (`X-Forwarded-For`, then `X-Real-IP`) and falls back
/// to the TCP peer address, which requires serving with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if let Some(ip) = ip_from_headers(req.headers()) {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Client IP as reported by an upstream proxy.
fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    // First IP in the X-Forwarded-For chain is the original client
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_seconds: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_seconds)
        .burst_size(burst)
        .finish()
        .expect("rate limiter period and burst must be non-zero");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// One token every 6 seconds, `burst` at once.
///
/// # Panics
///
/// Panics if `burst` is zero; `StorefrontConfig::from_env` rejects that.
#[must_use]
pub fn auth_rate_limiter(burst: u32) -> RateLimiterLayer {
    limiter(6, burst)
}

/// Create rate limiter for wishlist reads: ~60 requests per minute per IP.
///
/// One token per second, `burst` at once.
///
/// # Panics
///
/// Panics if `burst` is zero; `StorefrontConfig::from_env` rejects that.
#[must_use]
pub fn api_rate_limiter(burst: u32) -> RateLimiterLayer {
    limiter(1, burst)
}

/// Create rate limiter for wishlist adds and removes.
///
/// One token per second, `burst` at once. A login merge fires one add per
/// guest product at once, so `StorefrontConfig::from_env` keeps `burst` at or
/// above `MAX_GUEST_WISHLIST_ITEMS`. Reads use their own bucket, so the
/// refetch after a merge is never throttled by it.
///
/// # Panics
///
/// Panics if `burst` is zero.
#[must_use]
pub fn wishlist_write_rate_limiter(burst: u32) -> RateLimiterLayer {
    limiter(1, burst)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(
            ip_from_headers(&headers),
            Some("203.0.113.7".parse().unwrap())
        );
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static(" 198.51.100.2 "));
        assert_eq!(
            ip_from_headers(&headers),
            Some("198.51.100.2".parse().unwrap())
        );
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(ip_from_headers(&HeaderMap::new()), None);
    }
}
