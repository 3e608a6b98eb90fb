//! Wishlist wire types shared by the storefront API and its clients.
//!
//! Field names are camelCase on the wire (`productId`, `productIds`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProductId, UserId};

/// Most products a guest wishlist holds on one device.
///
/// Signing in sends one add per guest product at once, so the storefront's
/// write rate limit must allow at least this many requests in a burst.
pub const MAX_GUEST_WISHLIST_ITEMS: usize = 100;

/// Body of `POST /api/wishlist` and `DELETE /api/wishlist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemRequest {
    pub product_id: ProductId,
}

impl WishlistItemRequest {
    #[must_use]
    pub const fn new(product_id: ProductId) -> Self {
        Self { product_id }
    }
}

/// Response of `GET /api/wishlist`: the account's saved products, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistProductIds {
    pub product_ids: Vec<ProductId>,
}

/// A persisted wishlist entry owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}
