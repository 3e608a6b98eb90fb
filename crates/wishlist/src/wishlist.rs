//! The wishlist reconciliation component.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nectar_core::ProductId;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::WishlistError;
use crate::merge::{MergePolicy, MergeReport, merge_into};
use crate::notice::Notice;
use crate::remote::RemoteWishlist;
use crate::storage::LocalStorage;
use crate::store::{ActiveStore, LocalSet, RemoteView};

const NOTICE_CAPACITY: usize = 16;

/// Result of a successful toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Read-only view of the in-flight request count.
///
/// Can be moved to another task to observe [`Wishlist::is_loading`] while a
/// toggle is suspended.
#[derive(Debug, Clone)]
pub struct LoadingHandle(Arc<AtomicUsize>);

impl LoadingHandle {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::Acquire) > 0
    }
}

/// Increments the in-flight count for its lifetime.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A shopper's wishlist across the anonymous and signed-in identities.
///
/// The caller reports the session's auth state through [`observe_auth`]
/// whenever it may have changed; the component switches stores and runs the
/// merge on the anonymous → authenticated edge only.
///
/// [`observe_auth`]: Wishlist::observe_auth
pub struct Wishlist<S, R> {
    storage: S,
    remote: R,
    slot_key: String,
    store: ActiveStore,
    previous_authenticated: bool,
    merge_policy: MergePolicy,
    cache_ttl: Duration,
    in_flight: Arc<AtomicUsize>,
    notices: broadcast::Sender<Notice>,
}

impl<S: LocalStorage, R: RemoteWishlist> Wishlist<S, R> {
    /// Create the component in the anonymous state, reading the local slot.
    pub fn new(storage: S, remote: R, config: &ClientConfig) -> Self {
        let local = LocalSet::load(&storage, &config.slot_key);
        debug!(count = local.len(), "Loaded local wishlist");
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            storage,
            remote,
            slot_key: config.slot_key.clone(),
            store: ActiveStore::Anonymous(local),
            previous_authenticated: false,
            merge_policy: config.merge_policy,
            cache_ttl: config.cache_ttl,
            in_flight: Arc::new(AtomicUsize::new(0)),
            notices,
        }
    }

    /// Subscribe to user-facing notices.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// The store currently answering reads.
    pub const fn active_store(&self) -> &ActiveStore {
        &self.store
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// True while an authenticated add or remove is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn loading_handle(&self) -> LoadingHandle {
        LoadingHandle(Arc::clone(&self.in_flight))
    }

    /// The active wishlist.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` if the server view has to be refetched and the
    /// fetch fails.
    pub async fn product_ids(&self) -> Result<Vec<ProductId>, WishlistError> {
        match &self.store {
            ActiveStore::Anonymous(local) => Ok(local.ids().to_vec()),
            ActiveStore::Authenticated(view) => {
                Ok(view.get_or_fetch(&self.remote).await?.to_vec())
            }
        }
    }

    /// Whether `product_id` is in the active wishlist.
    ///
    /// # Errors
    ///
    /// Same as [`product_ids`](Self::product_ids).
    pub async fn is_in_wishlist(&self, product_id: &ProductId) -> Result<bool, WishlistError> {
        match &self.store {
            ActiveStore::Anonymous(local) => Ok(local.contains(product_id)),
            ActiveStore::Authenticated(view) => Ok(view
                .get_or_fetch(&self.remote)
                .await?
                .contains(product_id)),
        }
    }

    /// Add `product_id` if absent, remove it if present.
    ///
    /// Anonymous toggles are written to the local slot before returning.
    /// Authenticated toggles go to the server; on success the view is
    /// invalidated, on failure it is left as it was. Every failure also
    /// broadcasts a [`Notice::ToggleFailed`].
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` if the slot cannot be written or the server
    /// rejects the request.
    #[instrument(skip(self), fields(product_id = %product_id, authenticated = self.store.is_authenticated()))]
    pub async fn toggle(&mut self, product_id: &ProductId) -> Result<Toggled, WishlistError> {
        let result = match &mut self.store {
            ActiveStore::Anonymous(local) => {
                toggle_local(local, &self.storage, &self.slot_key, product_id)
            }
            ActiveStore::Authenticated(view) => {
                toggle_remote(view, &self.remote, &self.in_flight, product_id).await
            }
        };

        match &result {
            Ok(toggled) => debug!(?toggled, "Wishlist toggled"),
            Err(e) => {
                warn!(error = %e, "Wishlist toggle failed");
                self.notify(Notice::ToggleFailed {
                    message: e.user_message(),
                });
            }
        }
        result
    }

    /// Report the session's current auth state.
    ///
    /// Compares against the previously observed state and acts on edges only:
    ///
    /// - anonymous → authenticated: switch to the server store and merge the
    ///   local set into it. Returns the report when a merge batch was sent.
    /// - authenticated → anonymous: drop the server view and re-read the
    ///   local slot.
    ///
    /// Repeated observations of the same state do nothing.
    pub async fn observe_auth(&mut self, authenticated: bool) -> Option<MergeReport> {
        let previous = std::mem::replace(&mut self.previous_authenticated, authenticated);

        match (previous, authenticated) {
            (false, true) => self.on_sign_in().await,
            (true, false) => {
                self.on_sign_out();
                None
            }
            _ => None,
        }
    }

    #[instrument(skip(self))]
    async fn on_sign_in(&mut self) -> Option<MergeReport> {
        let view = RemoteView::new(self.cache_ttl);
        let snapshot = match std::mem::replace(&mut self.store, ActiveStore::Authenticated(view)) {
            ActiveStore::Anonymous(local) => local,
            ActiveStore::Authenticated(_) => LocalSet::default(),
        };

        if snapshot.is_empty() {
            debug!("No local wishlist to merge");
            return None;
        }

        info!(count = snapshot.len(), "Merging local wishlist into account");
        let report = merge_into(&self.remote, snapshot.ids()).await;
        self.finish_merge(&report).await;

        self.notify(Notice::Synced {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
        });
        Some(report)
    }

    async fn finish_merge(&self, report: &MergeReport) {
        let retained = match self.merge_policy {
            MergePolicy::RetainFailed => LocalSet::from_ids(report.failed.iter().cloned()),
            MergePolicy::DiscardFailed => LocalSet::default(),
        };

        let written = if retained.is_empty() {
            self.storage.remove(&self.slot_key)
        } else {
            warn!(count = retained.len(), "Keeping unmerged items for next sign-in");
            retained.save(&self.storage, &self.slot_key)
        };
        if let Err(e) = written {
            warn!(error = %e, "Failed to update local wishlist after merge");
        }

        if let ActiveStore::Authenticated(view) = &self.store {
            view.invalidate().await;
        }
    }

    fn on_sign_out(&mut self) {
        let local = LocalSet::load(&self.storage, &self.slot_key);
        debug!(count = local.len(), "Signed out, local wishlist active");
        self.store = ActiveStore::Anonymous(local);
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }
}

fn toggle_local(
    local: &mut LocalSet,
    storage: &impl LocalStorage,
    slot_key: &str,
    product_id: &ProductId,
) -> Result<Toggled, WishlistError> {
    let mut next = local.clone();
    let toggled = if next.remove(product_id) {
        Toggled::Removed
    } else {
        next.insert(product_id.clone())?;
        Toggled::Added
    };

    next.save(storage, slot_key)?;
    *local = next;
    Ok(toggled)
}

async fn toggle_remote<R: RemoteWishlist>(
    view: &RemoteView,
    remote: &R,
    in_flight: &AtomicUsize,
    product_id: &ProductId,
) -> Result<Toggled, WishlistError> {
    let present = view.get_or_fetch(remote).await?.contains(product_id);

    let toggled = {
        let _guard = InFlight::enter(in_flight);
        if present {
            remote.remove(product_id).await?;
            Toggled::Removed
        } else {
            remote.add(product_id).await?;
            Toggled::Added
        }
    };

    view.invalidate().await;
    Ok(toggled)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{MemoryRemote, pid};

    const SLOT: &str = "nectar.wishlist";

    fn config() -> ClientConfig {
        ClientConfig::new("http://127.0.0.1:3000".parse().unwrap())
    }

    fn wishlist(storage: &MemoryStorage, remote: &MemoryRemote) -> Wishlist<MemoryStorage, MemoryRemote> {
        Wishlist::new(storage.clone(), remote.clone(), &config())
    }

    // -------------------------------------------------------------------------
    // Anonymous
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_starts_from_local_slot() {
        let storage = MemoryStorage::with_slot(SLOT, r#"["p1","p2"]"#);
        let wl = wishlist(&storage, &MemoryRemote::default());

        assert!(!wl.active_store().is_authenticated());
        assert_eq!(wl.product_ids().await.unwrap(), vec![pid("p1"), pid("p2")]);
        assert!(wl.is_in_wishlist(&pid("p1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_anonymous_toggle_twice_restores_membership() {
        let storage = MemoryStorage::new();
        let remote = MemoryRemote::default();
        let mut wl = wishlist(&storage, &remote);

        assert_eq!(wl.toggle(&pid("p1")).await.unwrap(), Toggled::Added);
        assert!(wl.is_in_wishlist(&pid("p1")).await.unwrap());
        assert_eq!(storage.load(SLOT).unwrap().as_deref(), Some(r#"["p1"]"#));

        assert_eq!(wl.toggle(&pid("p1")).await.unwrap(), Toggled::Removed);
        assert!(!wl.is_in_wishlist(&pid("p1")).await.unwrap());
        assert_eq!(storage.load(SLOT).unwrap().as_deref(), Some("[]"));

        assert!(remote.add_calls().is_empty());
        assert_eq!(remote.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_list_survives_restart() {
        let storage = MemoryStorage::new();
        let remote = MemoryRemote::default();

        let mut wl = wishlist(&storage, &remote);
        wl.toggle(&pid("p2")).await.unwrap();
        wl.toggle(&pid("p1")).await.unwrap();
        drop(wl);

        let wl = wishlist(&storage, &remote);
        assert_eq!(wl.product_ids().await.unwrap(), vec![pid("p2"), pid("p1")]);
    }

    #[tokio::test]
    async fn test_full_guest_wishlist_refuses_new_products() {
        let ids: Vec<String> = (0..nectar_core::MAX_GUEST_WISHLIST_ITEMS)
            .map(|i| format!("p{i}"))
            .collect();
        let raw = serde_json::to_string(&ids).unwrap();
        let storage = MemoryStorage::with_slot(SLOT, &raw);
        let mut wl = wishlist(&storage, &MemoryRemote::default());
        let mut notices = wl.subscribe();

        let err = wl.toggle(&pid("one-more")).await.unwrap_err();
        assert!(matches!(err, WishlistError::Full { .. }));
        assert!(matches!(notices.try_recv().unwrap(), Notice::ToggleFailed { .. }));
        assert_eq!(storage.load(SLOT).unwrap().as_deref(), Some(raw.as_str()));

        // Removing still works and frees a place
        assert_eq!(wl.toggle(&pid("p0")).await.unwrap(), Toggled::Removed);
        assert_eq!(wl.toggle(&pid("one-more")).await.unwrap(), Toggled::Added);
    }

    #[tokio::test]
    async fn test_malformed_slot_starts_empty() {
        let storage = MemoryStorage::with_slot(SLOT, "{oops");
        let wl = wishlist(&storage, &MemoryRemote::default());
        assert!(wl.product_ids().await.unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // Authenticated
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_authenticated_toggle_goes_to_server() {
        let remote = MemoryRemote::with_ids(["p3"]);
        let mut wl = wishlist(&MemoryStorage::new(), &remote);
        wl.observe_auth(true).await;

        assert_eq!(wl.toggle(&pid("p1")).await.unwrap(), Toggled::Added);
        assert_eq!(wl.toggle(&pid("p3")).await.unwrap(), Toggled::Removed);

        assert_eq!(remote.add_calls(), vec![pid("p1")]);
        assert_eq!(remote.remove_calls(), vec![pid("p3")]);
        assert_eq!(wl.product_ids().await.unwrap(), vec![pid("p1")]);
        assert!(!wl.is_loading());
    }

    #[tokio::test]
    async fn test_successful_toggle_invalidates_view() {
        let remote = MemoryRemote::with_ids(["p1"]);
        let mut wl = wishlist(&MemoryStorage::new(), &remote);
        wl.observe_auth(true).await;

        wl.product_ids().await.unwrap();
        wl.product_ids().await.unwrap();
        assert_eq!(remote.list_calls(), 1);

        wl.toggle(&pid("p2")).await.unwrap();
        wl.product_ids().await.unwrap();
        assert_eq!(remote.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_toggle_leaves_view_and_notifies() {
        let remote = MemoryRemote::with_ids(["p1"]);
        let mut wl = wishlist(&MemoryStorage::new(), &remote);
        let mut notices = wl.subscribe();
        wl.observe_auth(true).await;
        wl.product_ids().await.unwrap();

        remote.fail_writes("Wishlist is full");
        let err = wl.toggle(&pid("p2")).await.unwrap_err();
        assert_eq!(err.user_message(), "Wishlist is full");

        assert_eq!(
            notices.try_recv().unwrap(),
            Notice::ToggleFailed {
                message: "Wishlist is full".to_string()
            }
        );
        assert_eq!(wl.product_ids().await.unwrap(), vec![pid("p1")]);
        assert_eq!(remote.list_calls(), 1);
        assert!(!wl.is_loading());
    }

    #[tokio::test]
    async fn test_loading_is_visible_from_another_task() {
        let remote = MemoryRemote::default();
        let mut wl = wishlist(&MemoryStorage::new(), &remote);
        wl.observe_auth(true).await;
        wl.product_ids().await.unwrap();

        let handle = wl.loading_handle();
        let observer = tokio::spawn(async move {
            loop {
                if handle.is_loading() {
                    return true;
                }
                tokio::task::yield_now().await;
            }
        });

        // MemoryRemote::add yields once, so the spawned task gets to run
        // on a single-threaded runtime while the add is pending
        wl.toggle(&pid("p1")).await.unwrap();
        let saw_loading = tokio::time::timeout(Duration::from_secs(1), observer)
            .await
            .is_ok_and(|joined| joined.unwrap_or(false));

        assert!(saw_loading);
        assert!(!wl.is_loading());
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sign_in_merges_local_into_server() {
        let storage = MemoryStorage::with_slot(SLOT, r#"["p1","p2"]"#);
        let remote = MemoryRemote::with_ids(["p2", "p3"]);
        let mut wl = wishlist(&storage, &remote);
        let mut notices = wl.subscribe();

        let report = wl.observe_auth(true).await.unwrap();

        assert_eq!(report.succeeded, vec![pid("p1"), pid("p2")]);
        assert!(report.failed.is_empty());
        assert_eq!(remote.add_calls(), vec![pid("p1"), pid("p2")]);
        assert_eq!(remote.max_concurrent_adds(), 2);

        let mut ids = wl.product_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![pid("p1"), pid("p2"), pid("p3")]);
        assert_eq!(storage.load(SLOT).unwrap(), None);

        assert_eq!(
            notices.try_recv().unwrap(),
            Notice::Synced {
                succeeded: 2,
                failed: 0
            }
        );
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_merge_runs_once_per_sign_in() {
        let storage = MemoryStorage::with_slot(SLOT, r#"["p1"]"#);
        let remote = MemoryRemote::default();
        let mut wl = wishlist(&storage, &remote);

        assert!(wl.observe_auth(true).await.is_some());
        assert!(wl.observe_auth(true).await.is_none());
        assert!(wl.observe_auth(true).await.is_none());

        assert_eq!(remote.add_calls(), vec![pid("p1")]);
    }

    #[tokio::test]
    async fn test_empty_local_set_sign_in_is_silent() {
        let remote = MemoryRemote::with_ids(["p9"]);
        let mut wl = wishlist(&MemoryStorage::new(), &remote);
        let mut notices = wl.subscribe();

        assert!(wl.observe_auth(true).await.is_none());

        assert!(remote.add_calls().is_empty());
        assert!(notices.try_recv().is_err());
        assert!(wl.active_store().is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_merge_items_are_retained() {
        let storage = MemoryStorage::with_slot(SLOT, r#"["p1","p2"]"#);
        let remote = MemoryRemote::default();
        remote.fail_add(&pid("p2"), "Product unavailable");
        let mut wl = wishlist(&storage, &remote);
        let mut notices = wl.subscribe();

        let report = wl.observe_auth(true).await.unwrap();

        assert_eq!(report.failed, vec![pid("p2")]);
        assert_eq!(storage.load(SLOT).unwrap().as_deref(), Some(r#"["p2"]"#));
        assert_eq!(
            notices.try_recv().unwrap(),
            Notice::Synced {
                succeeded: 1,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_failed_merge_items_are_discarded_by_policy() {
        let storage = MemoryStorage::with_slot(SLOT, r#"["p1","p2"]"#);
        let remote = MemoryRemote::default();
        remote.fail_add(&pid("p2"), "Product unavailable");
        let config = config().with_merge_policy(MergePolicy::DiscardFailed);
        let mut wl = Wishlist::new(storage.clone(), remote.clone(), &config);

        let report = wl.observe_auth(true).await.unwrap();

        assert_eq!(report.failed, vec![pid("p2")]);
        assert_eq!(storage.load(SLOT).unwrap(), None);
    }

    #[tokio::test]
    async fn test_retained_items_merge_at_next_sign_in() {
        let storage = MemoryStorage::with_slot(SLOT, r#"["p1"]"#);
        let remote = MemoryRemote::default();
        remote.fail_writes("Service unavailable");
        let mut wl = wishlist(&storage, &remote);

        let report = wl.observe_auth(true).await.unwrap();
        assert_eq!(report.failed, vec![pid("p1")]);

        wl.observe_auth(false).await;
        assert_eq!(wl.product_ids().await.unwrap(), vec![pid("p1")]);

        let healthy = MemoryRemote::default();
        let mut wl = wishlist(&storage, &healthy);
        let report = wl.observe_auth(true).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(healthy.ids(), vec![pid("p1")]);
        assert_eq!(storage.load(SLOT).unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_out_returns_to_local_slot() {
        let storage = MemoryStorage::new();
        let remote = MemoryRemote::with_ids(["p3"]);
        let mut wl = wishlist(&storage, &remote);
        wl.observe_auth(true).await;
        assert_eq!(wl.product_ids().await.unwrap(), vec![pid("p3")]);

        assert!(wl.observe_auth(false).await.is_none());

        assert!(!wl.active_store().is_authenticated());
        assert!(wl.product_ids().await.unwrap().is_empty());

        wl.toggle(&pid("p4")).await.unwrap();
        assert_eq!(remote.ids(), vec![pid("p3")]);
        assert_eq!(storage.load(SLOT).unwrap().as_deref(), Some(r#"["p4"]"#));
    }

    #[tokio::test]
    async fn test_second_sign_in_merges_again() {
        let storage = MemoryStorage::with_slot(SLOT, r#"["p1"]"#);
        let remote = MemoryRemote::default();
        let mut wl = wishlist(&storage, &remote);

        wl.observe_auth(true).await;
        wl.observe_auth(false).await;
        wl.toggle(&pid("p2")).await.unwrap();
        let report = wl.observe_auth(true).await.unwrap();

        assert_eq!(report.succeeded, vec![pid("p2")]);
        assert_eq!(remote.add_calls(), vec![pid("p1"), pid("p2")]);
    }
}
