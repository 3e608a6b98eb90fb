//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness check
//! GET    /health/ready           - Readiness check (database)
//!
//! # Auth API (rate limited)
//! POST   /api/auth/register      - Create account, start session
//! POST   /api/auth/login         - Password login, start session
//! POST   /api/auth/logout        - End session
//! GET    /api/auth/me            - Current session user (401 when anonymous)
//!
//! # Wishlist API (requires auth; reads and writes rate limited separately)
//! GET    /api/wishlist           - Saved product IDs
//! POST   /api/wishlist           - Save a product   { "productId": "..." }
//! DELETE /api/wishlist           - Unsave a product { "productId": "..." }
//! ```

pub mod api;
pub mod health;

use axum::{
    Router,
    extract::Request,
    middleware::from_fn,
    routing::{MethodRouter, get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::RateLimitConfig;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, request_id_middleware,
    wishlist_write_rate_limiter,
};
use crate::state::AppState;

/// Create the auth API routes router.
pub fn auth_api_routes(limits: RateLimitConfig) -> Router<AppState> {
    Router::new()
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login))
        .route("/logout", post(api::auth::logout))
        .route("/me", get(api::auth::me))
        .layer(auth_rate_limiter(limits.auth_burst))
}

/// Create the wishlist API routes router.
pub fn wishlist_api_routes(limits: RateLimitConfig) -> Router<AppState> {
    Router::new().route(
        "/",
        wishlist_methods(
            get(api::wishlist::list),
            post(api::wishlist::add).delete(api::wishlist::remove),
            limits,
        ),
    )
}

/// Put wishlist reads and writes behind separate per-IP buckets.
fn wishlist_methods<S>(
    reads: MethodRouter<S>,
    writes: MethodRouter<S>,
    limits: RateLimitConfig,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    reads
        .layer(api_rate_limiter(limits.api_burst))
        .merge(writes.layer(wishlist_write_rate_limiter(limits.wishlist_write_burst)))
}

/// Create all routes for the storefront.
pub fn routes(limits: RateLimitConfig) -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_api_routes(limits))
        .nest("/api/wishlist", wishlist_api_routes(limits))
}

/// Assemble the full application: routes, middleware stack, and state.
///
/// Sentry layers are added by the binary, outside this router.
pub fn app(state: AppState, session_store: PostgresStore) -> Router {
    let session_layer = create_session_layer(session_store, state.config());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes(state.config().rate_limit))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::StatusCode;
    use nectar_core::MAX_GUEST_WISHLIST_ITEMS;

    use super::*;

    async fn spawn_limited(limits: RateLimitConfig) -> SocketAddr {
        let app = Router::new().route(
            "/api/wishlist",
            wishlist_methods(
                get(|| async { StatusCode::OK }),
                post(|| async { StatusCode::CREATED }).delete(|| async { StatusCode::NO_CONTENT }),
                limits,
            ),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_full_guest_merge_then_refetch_is_not_throttled() {
        let limits = RateLimitConfig::default();
        assert!(MAX_GUEST_WISHLIST_ITEMS > usize::try_from(limits.api_burst).unwrap());

        let addr = spawn_limited(limits).await;
        let url = format!("http://{addr}/api/wishlist");
        let client = reqwest::Client::new();

        let adds = futures::future::join_all(
            (0..MAX_GUEST_WISHLIST_ITEMS).map(|_| client.post(&url).send()),
        )
        .await;
        for response in adds {
            assert_eq!(response.unwrap().status(), StatusCode::CREATED);
        }

        let refetch = client.get(&url).send().await.unwrap();
        assert_eq!(refetch.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_writes_past_burst_are_throttled() {
        let limits = RateLimitConfig {
            wishlist_write_burst: 3,
            ..RateLimitConfig::default()
        };
        let addr = spawn_limited(limits).await;
        let url = format!("http://{addr}/api/wishlist");
        let client = reqwest::Client::new();

        for _ in 0..limits.wishlist_write_burst {
            let response = client.delete(&url).send().await.unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }
        let response = client.delete(&url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // Reads draw from their own bucket
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
