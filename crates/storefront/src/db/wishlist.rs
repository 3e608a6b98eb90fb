//! Wishlist repository for database operations.
//!
//! A wishlist is a set: `(user_id, product_id)` is the primary key of
//! `storefront.wishlist_item`, adds are `ON CONFLICT DO NOTHING`, and removing
//! an absent product is not an error.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use nectar_core::{ProductId, UserId, WishlistItem};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct WishlistItemRow {
    user_id: UserId,
    product_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<WishlistItemRow> for WishlistItem {
    type Error = RepositoryError;

    fn try_from(row: WishlistItemRow) -> Result<Self, Self::Error> {
        let product_id = ProductId::parse(&row.product_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid product id in database: {e}"))
        })?;

        Ok(Self {
            user_id: row.user_id,
            product_id,
            created_at: row.created_at,
        })
    }
}

/// Outcome of adding a product to a wishlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entry was created.
    Created(WishlistItem),
    /// The product was already saved; the existing entry is returned.
    AlreadyPresent(WishlistItem),
}

impl AddOutcome {
    /// The entry, regardless of whether it was just created.
    #[must_use]
    pub fn into_item(self) -> WishlistItem {
        match self {
            Self::Created(item) | Self::AlreadyPresent(item) => item,
        }
    }
}

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the product IDs saved by a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored product ID is invalid.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT product_id
            FROM storefront.wishlist_item
            WHERE user_id = $1
            ORDER BY created_at ASC, product_id ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(raw,)| {
                ProductId::parse(&raw).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid product id in database: {e}"))
                })
            })
            .collect()
    }

    /// Add a product to a user's wishlist.
    ///
    /// Adding a product that is already saved leaves the existing entry untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: &ProductId,
    ) -> Result<AddOutcome, RepositoryError> {
        let inserted = sqlx::query_as::<_, WishlistItemRow>(
            r"
            INSERT INTO storefront.wishlist_item (user_id, product_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, product_id) DO NOTHING
            RETURNING user_id, product_id, created_at
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(AddOutcome::Created(row.try_into()?));
        }

        // Conflict: the row exists (or was removed concurrently, in which case
        // NotFound surfaces and the caller can retry).
        let existing = sqlx::query_as::<_, WishlistItemRow>(
            r"
            SELECT user_id, product_id, created_at
            FROM storefront.wishlist_item
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(AddOutcome::AlreadyPresent(existing.try_into()?))
    }

    /// Remove a product from a user's wishlist.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was deleted, `false` if it wasn't saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: &ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.wishlist_item
            WHERE user_id = $1 AND product_id = $2
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
