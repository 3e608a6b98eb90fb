//! The server-side wishlist store.

mod http;

use std::future::Future;

use nectar_core::{Email, ProductId, UserId};
use serde::Deserialize;

use crate::error::WishlistError;

pub use http::HttpRemote;

/// The account's wishlist on the storefront.
///
/// `add` of a present id and `remove` of an absent id both succeed.
pub trait RemoteWishlist: Send + Sync {
    /// Fetch the account's saved product ids.
    fn list(&self) -> impl Future<Output = Result<Vec<ProductId>, WishlistError>> + Send;

    /// Save a product.
    fn add(&self, product_id: &ProductId) -> impl Future<Output = Result<(), WishlistError>> + Send;

    /// Unsave a product.
    fn remove(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), WishlistError>> + Send;
}

/// The signed-in account, as reported by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub email: Email,
}
