//! The two wishlist stores and the tag saying which one is authoritative.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use nectar_core::{MAX_GUEST_WISHLIST_ITEMS, ProductId};
use tracing::{debug, warn};

use crate::error::{StorageError, WishlistError};
use crate::remote::RemoteWishlist;
use crate::storage::LocalStorage;

/// Which store answers reads and receives toggles.
#[derive(Debug)]
pub enum ActiveStore {
    /// Not signed in: the device-local slot.
    Anonymous(LocalSet),
    /// Signed in: the storefront, through a cached view.
    Authenticated(RemoteView),
}

impl ActiveStore {
    /// Whether the server store is active.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

// =============================================================================
// LocalSet
// =============================================================================

/// The anonymous wishlist: unique product ids in the order they were saved.
///
/// Holds at most [`MAX_GUEST_WISHLIST_ITEMS`] products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSet {
    ids: Vec<ProductId>,
}

impl LocalSet {
    /// Build a set, dropping repeated ids and anything past the size cap.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        Self::collect(ids).0
    }

    /// Returns the set and the number of distinct ids that did not fit.
    fn collect(ids: impl IntoIterator<Item = ProductId>) -> (Self, usize) {
        let mut set = Self::default();
        let mut overflow = 0;
        for id in ids {
            if set.contains(&id) {
                continue;
            }
            if set.is_full() {
                overflow += 1;
                continue;
            }
            set.ids.push(id);
        }
        (set, overflow)
    }

    /// Read the set from a storage slot.
    ///
    /// A missing slot is an empty set. Unreadable or malformed contents are
    /// logged and also treated as empty; entries that are not valid product
    /// ids are skipped. An over-size slot keeps its oldest
    /// [`MAX_GUEST_WISHLIST_ITEMS`] products.
    #[must_use]
    pub fn load(storage: &impl LocalStorage, key: &str) -> Self {
        let raw = match storage.load(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!(error = %e, slot = key, "Failed to read wishlist slot");
                return Self::default();
            }
        };

        let entries: Vec<String> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, slot = key, "Malformed wishlist slot, starting empty");
                return Self::default();
            }
        };

        let ids = entries.into_iter().filter_map(|entry| {
            ProductId::parse(&entry)
                .inspect_err(|e| warn!(error = %e, entry = %entry, "Skipping invalid product id"))
                .ok()
        });
        let (set, overflow) = Self::collect(ids);
        if overflow > 0 {
            warn!(
                slot = key,
                dropped = overflow,
                max = MAX_GUEST_WISHLIST_ITEMS,
                "Wishlist slot over size limit, dropping newest entries"
            );
        }
        set
    }

    /// Write the set to a storage slot as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be written.
    pub fn save(&self, storage: &impl LocalStorage, key: &str) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&self.ids)?;
        storage.save(key, &raw)
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.ids.contains(id)
    }

    /// Append `id`. Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Full` if the set is at its size cap.
    pub fn insert(&mut self, id: ProductId) -> Result<bool, WishlistError> {
        if self.contains(&id) {
            return Ok(false);
        }
        if self.is_full() {
            return Err(WishlistError::Full {
                max: MAX_GUEST_WISHLIST_ITEMS,
            });
        }
        self.ids.push(id);
        Ok(true)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ids.len() >= MAX_GUEST_WISHLIST_ITEMS
    }

    /// Remove `id`. Returns `false` if it was absent.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.ids.len() != before
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// =============================================================================
// RemoteView
// =============================================================================

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct ViewKey;

/// The last-fetched server wishlist.
///
/// Reads are served from the cache until it is invalidated or its TTL runs
/// out, then refetched.
#[derive(Clone)]
pub struct RemoteView {
    cache: Cache<ViewKey, Arc<Vec<ProductId>>>,
}

impl std::fmt::Debug for RemoteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteView")
            .field("cached", &self.cache.contains_key(&ViewKey))
            .finish()
    }
}

impl RemoteView {
    /// An empty view whose fetched contents stay fresh for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { cache }
    }

    /// The server set, fetching it if the view is stale.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` if the fetch fails. Nothing is cached then.
    pub async fn get_or_fetch<R: RemoteWishlist>(
        &self,
        remote: &R,
    ) -> Result<Arc<Vec<ProductId>>, WishlistError> {
        if let Some(ids) = self.cache.get(&ViewKey).await {
            debug!("Cache hit for wishlist view");
            return Ok(ids);
        }

        let ids = Arc::new(remote.list().await?);
        self.cache.insert(ViewKey, Arc::clone(&ids)).await;
        Ok(ids)
    }

    /// Mark the view stale so the next read refetches.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&ViewKey).await;
    }

    /// Whether a fetched set is currently held.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.contains_key(&ViewKey)
    }
}
