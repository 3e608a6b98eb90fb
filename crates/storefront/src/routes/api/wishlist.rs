//! Wishlist API routes.
//!
//! The server-side store for authenticated shoppers. All three operations are
//! idempotent so a client can retry them, and so a login-time merge can
//! re-send products the account already has.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::instrument;

use nectar_core::{WishlistItem, WishlistItemRequest, WishlistProductIds};

use crate::db::WishlistRepository;
use crate::db::wishlist::AddOutcome;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// List the current user's saved product IDs.
///
/// GET /api/wishlist
#[instrument(skip_all, fields(user_id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<WishlistProductIds>> {
    let product_ids = WishlistRepository::new(state.pool()).list(user.id).await?;

    Ok(Json(WishlistProductIds { product_ids }))
}

/// Save a product.
///
/// POST /api/wishlist
///
/// Returns `201 Created` for a new entry and `200 OK` with the existing entry
/// when the product was already saved.
#[instrument(skip_all, fields(user_id, product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<WishlistItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WishlistItem>)> {
    let Json(WishlistItemRequest { product_id }) = body?;
    tracing::Span::current().record("product_id", product_id.as_str());

    let outcome = WishlistRepository::new(state.pool())
        .add(user.id, &product_id)
        .await?;

    let status = add_status(&outcome);
    if status == StatusCode::CREATED {
        tracing::debug!("Product saved to wishlist");
    }

    Ok((status, Json(outcome.into_item())))
}

const fn add_status(outcome: &AddOutcome) -> StatusCode {
    match outcome {
        AddOutcome::Created(_) => StatusCode::CREATED,
        AddOutcome::AlreadyPresent(_) => StatusCode::OK,
    }
}

/// Unsave a product.
///
/// DELETE /api/wishlist
///
/// Returns `204 No Content` whether or not the product was saved.
#[instrument(skip_all, fields(user_id, product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<WishlistItemRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(WishlistItemRequest { product_id }) = body?;
    tracing::Span::current().record("product_id", product_id.as_str());

    let removed = WishlistRepository::new(state.pool())
        .remove(user.id, &product_id)
        .await?;

    if removed {
        tracing::debug!("Product removed from wishlist");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, header},
        response::IntoResponse,
    };
    use chrono::Utc;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use nectar_core::{Email, ProductId, UserId};

    use super::*;
    use crate::config::{RateLimitConfig, SentryConfig, StorefrontConfig};
    use crate::models::CurrentUser;

    fn item() -> WishlistItem {
        WishlistItem {
            user_id: UserId::new(1),
            product_id: ProductId::parse("p1").unwrap(),
            created_at: Utc::now(),
        }
    }

    /// State whose pool never connects; requests rejected before the
    /// database is touched still run through the real handlers.
    fn offline_state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_expiry_days: 7,
            rate_limit: RateLimitConfig::default(),
            sentry: SentryConfig::default(),
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/test")
            .unwrap();
        AppState::new(config, pool)
    }

    fn shopper() -> RequireAuth {
        RequireAuth(CurrentUser {
            id: UserId::new(1),
            email: Email::parse("shopper@example.com").unwrap(),
        })
    }

    async fn parse_body(
        content_type: Option<&str>,
        body: &'static str,
    ) -> std::result::Result<Json<WishlistItemRequest>, JsonRejection> {
        let mut request = Request::builder().method("POST").uri("/api/wishlist");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        Json::from_request(request.body(Body::from(body)).unwrap(), &()).await
    }

    #[test]
    fn test_add_status_distinguishes_new_entries() {
        assert_eq!(add_status(&AddOutcome::Created(item())), StatusCode::CREATED);
        assert_eq!(add_status(&AddOutcome::AlreadyPresent(item())), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_bodies_with_400() {
        let cases = [
            (Some("application/json"), r#"{"productId":""}"#),
            (Some("application/json"), r#"{"productId":"has space"}"#),
            (Some("application/json"), r#"{"product_id":"p1"}"#),
            (Some("application/json"), "not json"),
            (None, r#"{"productId":"p1"}"#),
        ];

        for (content_type, body) in cases {
            let parsed = parse_body(content_type, body).await;
            assert!(parsed.is_err(), "{body}");

            let err = add(State(offline_state()), shopper(), parsed)
                .await
                .unwrap_err();
            assert_eq!(
                err.into_response().status(),
                StatusCode::BAD_REQUEST,
                "{body}"
            );
        }
    }

    #[tokio::test]
    async fn test_remove_rejects_invalid_product_id_with_400() {
        let parsed = parse_body(Some("application/json"), r#"{"productId":""}"#).await;

        let err = remove(State(offline_state()), shopper(), parsed)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
